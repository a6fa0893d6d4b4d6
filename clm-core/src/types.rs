//! Core types for the attestation graph.
//!
//! Digests and record uids are 32-byte values rendered as 0x-prefixed hex,
//! matching the on-chain schema (`bytes32 contentHash, bytes32 parent`).
//! Both reserve the all-zero value as a sentinel: a zero digest means "no
//! content", a zero uid means "no parent" (root section).

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Schema version bound into every record payload.
pub const SCHEMA_VERSION: u16 = 2;

/// Error parsing a 32-byte hex value.
#[derive(Debug, thiserror::Error)]
#[error("Invalid 32-byte hex value: {0}")]
pub struct HexParseError(String);

fn parse_hex32(s: &str) -> Result<[u8; 32], HexParseError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| HexParseError(s.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| HexParseError(s.to_string()))?;
    Ok(arr)
}

/// Content digest of a section's textual payload.
///
/// Computed with keccak256 over the exact UTF-8 bytes of the content.
/// [`Digest::ZERO`] is reserved for absent or empty content and is never
/// produced by the hash function over non-empty input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Reserved sentinel for absent/empty content.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the reserved zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Digest {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(Self)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Opaque record identifier assigned by the ledger on submission.
///
/// Globally unique, assigned at most once per record, never reused.
/// [`RecordUid::ZERO`] is the reserved parent reference for root sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordUid([u8; 32]);

impl RecordUid {
    /// Reserved zero reference: "no parent".
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wrap raw uid bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw uid bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero parent reference.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for RecordUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for RecordUid {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(Self)
    }
}

impl Serialize for RecordUid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordUid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// One node of the hierarchical document tree.
///
/// Children lists are derived by the section graph from `parent` references;
/// they are never part of the input schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    /// Stable local identifier, unique within the document (e.g. "2.1.3").
    pub id: String,
    /// Display name.
    pub title: String,
    /// Optional display subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Local id of the parent section; `None` marks a root section.
    #[serde(default)]
    pub parent: Option<String>,
    /// Immutable sections must never be resubmitted with different content.
    #[serde(default)]
    pub immutable: bool,
    /// Textual payload; `None` for pure container sections.
    #[serde(default)]
    pub content: Option<String>,
}

impl Section {
    /// Whether this section carries no content of its own.
    pub fn is_container(&self) -> bool {
        match &self.content {
            None => true,
            Some(text) => text.is_empty(),
        }
    }

    /// Whether this section has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Record payload submitted to the ledger for one section.
///
/// Field set and order are fixed by the record schema:
/// `sectionId, version, title, content, contentHash, parent, immutable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Local section id.
    pub section_id: String,
    /// Schema version, see [`SCHEMA_VERSION`].
    pub version: u16,
    /// Section title.
    pub title: String,
    /// Section content; empty string for container sections.
    pub content: String,
    /// Digest of the content, [`Digest::ZERO`] for containers.
    pub content_digest: Digest,
    /// Parent record uid, [`RecordUid::ZERO`] for roots.
    pub parent: RecordUid,
    /// Immutability flag.
    pub immutable: bool,
}

impl RecordPayload {
    /// Build the payload for a section with its resolved parent reference.
    pub fn for_section(section: &Section, parent: RecordUid) -> Self {
        let content_digest = crate::hash::content_digest(section.content.as_deref());
        Self {
            section_id: section.id.clone(),
            version: SCHEMA_VERSION,
            title: section.title.clone(),
            content: section.content.clone().unwrap_or_default(),
            content_digest,
            parent,
            immutable: section.immutable,
        }
    }

    /// Deterministic byte encoding of the payload.
    ///
    /// Length-prefixed field concatenation in schema order. Used by the
    /// in-memory ledger to derive record uids; stable across runs.
    pub fn encode(&self) -> Vec<u8> {
        fn push_str(out: &mut Vec<u8>, s: &str) {
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }

        let mut out = Vec::with_capacity(self.content.len() + 128);
        push_str(&mut out, &self.section_id);
        out.extend_from_slice(&self.version.to_be_bytes());
        push_str(&mut out, &self.title);
        push_str(&mut out, &self.content);
        out.extend_from_slice(self.content_digest.as_bytes());
        out.extend_from_slice(self.parent.as_bytes());
        out.push(u8::from(self.immutable));
        out
    }
}

/// A record as returned by the ledger's query operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Ledger-assigned uid.
    pub uid: RecordUid,
    /// Decoded payload fields.
    pub payload: RecordPayload,
    /// Whether the record has been revoked (inactive).
    pub revoked: bool,
    /// When the record was appended.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-section result of a submission pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedRecord {
    /// Local section id.
    pub section_id: String,
    /// Uid returned by the ledger.
    pub uid: RecordUid,
    /// Content digest bound into the record.
    pub content_digest: Digest,
    /// Parent reference bound into the record.
    pub parent: RecordUid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let hexstr = "0x00000000000000000000000000000000000000000000000000000000000000ff";
        let uid: RecordUid = hexstr.parse().unwrap();
        assert_eq!(uid.to_string(), hexstr);
        assert!(!uid.is_zero());
        assert!(RecordUid::ZERO.is_zero());
    }

    #[test]
    fn test_hex_rejects_bad_input() {
        assert!("0x1234".parse::<Digest>().is_err());
        assert!("not hex".parse::<Digest>().is_err());
    }

    #[test]
    fn test_container_detection() {
        let container = Section {
            id: "1".into(),
            title: "Container".into(),
            subtitle: None,
            parent: None,
            immutable: false,
            content: None,
        };
        assert!(container.is_container());
        assert!(container.is_root());

        let leaf = Section {
            content: Some("text".into()),
            parent: Some("1".into()),
            ..container.clone()
        };
        assert!(!leaf.is_container());
        assert!(!leaf.is_root());
    }

    #[test]
    fn test_payload_encoding_deterministic() {
        let section = Section {
            id: "1.1".into(),
            title: "Definition".into(),
            subtitle: None,
            parent: Some("1".into()),
            immutable: true,
            content: Some("Some content".into()),
        };
        let a = RecordPayload::for_section(&section, RecordUid::ZERO).encode();
        let b = RecordPayload::for_section(&section, RecordUid::ZERO).encode();
        assert_eq!(a, b);

        let other = RecordPayload::for_section(
            &Section {
                content: Some("Other content".into()),
                ..section
            },
            RecordUid::ZERO,
        )
        .encode();
        assert_ne!(a, other);
    }
}
