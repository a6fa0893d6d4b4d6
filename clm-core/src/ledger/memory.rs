//! In-memory ledger for tests and submission rehearsals.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{Ledger, LedgerError, RecordBatch};
use crate::hash::keccak256;
use crate::types::{LedgerRecord, RecordPayload, RecordUid};

/// Append-only in-process ledger.
///
/// Uids are derived from the payload encoding plus a monotonic bump, so they
/// are unique even when the same payload is submitted twice. Revocation
/// marks records inactive without removing them.
pub struct MemoryLedger {
    records: RwLock<Vec<LedgerRecord>>,
    bump: AtomicU64,
    available: AtomicBool,
    submit_count: AtomicU32,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            bump: AtomicU64::new(0),
            available: AtomicBool::new(true),
            submit_count: AtomicU32::new(0),
        }
    }

    /// Toggle availability; an unavailable ledger fails every operation.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of submit calls observed (for tests).
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::SeqCst)
    }

    /// Total records held, revoked included.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("memory ledger disabled".into()))
        }
    }

    fn derive_uid(&self, payload: &RecordPayload) -> RecordUid {
        let bump = self.bump.fetch_add(1, Ordering::SeqCst);
        let mut bytes = payload.encode();
        bytes.extend_from_slice(&bump.to_be_bytes());
        RecordUid::from_bytes(*keccak256(&bytes).as_bytes())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn submit_record(&self, payload: RecordPayload) -> Result<RecordUid, LedgerError> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let uid = self.derive_uid(&payload);
        let record = LedgerRecord {
            uid,
            payload,
            revoked: false,
            created_at: chrono::Utc::now(),
        };

        let mut records = self.records.write().await;
        records.push(record);
        tracing::debug!(uid = %uid, "Appended record to memory ledger");
        Ok(uid)
    }

    async fn revoke_record(&self, uid: RecordUid) -> Result<(), LedgerError> {
        self.check_available()?;

        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.uid == uid) {
            Some(record) => {
                record.revoked = true;
                tracing::debug!(uid = %uid, "Revoked record");
                Ok(())
            }
            None => Err(LedgerError::NotFound(uid.to_string())),
        }
    }

    async fn query_records(&self, active_only: bool) -> Result<RecordBatch, LedgerError> {
        self.check_available()?;

        let records = self.records.read().await;
        let records = records
            .iter()
            .filter(|r| !active_only || !r.revoked)
            .cloned()
            .collect();
        Ok(RecordBatch {
            records,
            undecodable: Vec::new(),
        })
    }
}
