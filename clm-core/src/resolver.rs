//! Identifier resolution between local section ids and ledger record uids.
//!
//! The write path tracks `local id -> uid` as an append-only table populated
//! strictly in submission order; a section's parent reference can only be
//! resolved once the parent's record has been acknowledged. The read path
//! inverts fetched uids back to local ids to reconstruct structure.

use std::collections::HashMap;

use crate::types::{LedgerRecord, RecordUid, Section};

/// Error types for identifier resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A parent id has no registered uid yet. Given a correct topological
    /// order this is a sequencing bug, not a user-recoverable condition.
    #[error("Parent \"{parent}\" of section \"{section}\" has no registered uid (sequencing bug)")]
    UnresolvedParent { section: String, parent: String },

    /// A uid was already registered for this section (uids are append-only).
    #[error("Section \"{0}\" already has a registered uid")]
    AlreadyRegistered(String),
}

/// Append-only table of ledger-assigned uids, owned by one submission pass.
#[derive(Debug, Default)]
pub struct UidResolver {
    assigned: HashMap<String, RecordUid>,
    order: Vec<String>,
}

impl UidResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the uid returned for a submitted section.
    ///
    /// Each section id may be registered at most once.
    pub fn register(&mut self, section_id: &str, uid: RecordUid) -> Result<(), ResolverError> {
        if self.assigned.contains_key(section_id) {
            return Err(ResolverError::AlreadyRegistered(section_id.to_string()));
        }
        self.assigned.insert(section_id.to_string(), uid);
        self.order.push(section_id.to_string());
        Ok(())
    }

    /// Uid registered for a section, if any.
    pub fn get(&self, section_id: &str) -> Option<RecordUid> {
        self.assigned.get(section_id).copied()
    }

    /// Resolve the parent reference to bind into a section's record.
    ///
    /// Returns [`RecordUid::ZERO`] for roots. Fails with
    /// [`ResolverError::UnresolvedParent`] if the parent has not been
    /// submitted yet, which cannot happen under a valid topological order.
    pub fn resolve_parent(&self, section: &Section) -> Result<RecordUid, ResolverError> {
        match &section.parent {
            None => Ok(RecordUid::ZERO),
            Some(parent) => self.get(parent).ok_or_else(|| ResolverError::UnresolvedParent {
                section: section.id.clone(),
                parent: parent.clone(),
            }),
        }
    }

    /// Section ids in registration order.
    pub fn registration_order(&self) -> &[String] {
        &self.order
    }

    /// Number of registered uids.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether no uids have been registered.
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// Inverse uid index for the read path.
///
/// Built from a fetched record set; maps each observed uid back to the local
/// section id that record declared. A parent reference that does not appear
/// as some record's uid resolves to `None` and the record degrades to a root
/// for display purposes rather than failing the reconstruction.
#[derive(Debug, Default)]
pub struct UidIndex {
    by_uid: HashMap<RecordUid, String>,
}

impl UidIndex {
    /// Build the index from fetched records.
    pub fn from_records(records: &[LedgerRecord]) -> Self {
        let mut by_uid = HashMap::with_capacity(records.len());
        for record in records {
            by_uid.insert(record.uid, record.payload.section_id.clone());
        }
        Self { by_uid }
    }

    /// Local id of the record with the given uid, if observed.
    pub fn section_for(&self, uid: RecordUid) -> Option<&str> {
        self.by_uid.get(&uid).map(String::as_str)
    }

    /// Resolve a record's declared parent reference to a local id.
    ///
    /// `None` for the zero reference and for unknown uids (degraded root).
    pub fn parent_section(&self, record: &LedgerRecord) -> Option<&str> {
        if record.payload.parent.is_zero() {
            return None;
        }
        self.section_for(record.payload.parent)
    }
}
