//! Content hashing.
//!
//! Digests are keccak256 over the exact UTF-8 bytes of the content string,
//! with no normalization, so they are bit-exact across implementations and
//! match the digests bound into the on-chain records.

use sha3::{Digest as _, Keccak256};

use crate::types::Digest;

/// Compute the content digest for a section payload.
///
/// Absent and empty content both map to the reserved [`Digest::ZERO`]
/// sentinel rather than the keccak256 of the empty string, so "no content"
/// is distinguishable from any real digest.
pub fn content_digest(content: Option<&str>) -> Digest {
    match content {
        None => Digest::ZERO,
        Some(text) if text.is_empty() => Digest::ZERO,
        Some(text) => keccak256(text.as_bytes()),
    }
}

/// keccak256 over raw bytes.
pub fn keccak256(bytes: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    Digest::from_bytes(hasher.finalize().into())
}
