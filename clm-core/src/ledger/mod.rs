//! Ledger collaborator abstraction.
//!
//! The attestation ledger is an external append-only, schema-typed record
//! log: records can be appended and revoked but never deleted. This module
//! defines the capability trait consumed by the submitter and verifier,
//! an in-memory implementation for tests and rehearsals, and a read-only
//! client for the hosted attestation index.

mod easscan;
mod memory;

pub use easscan::EasScanLedger;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{LedgerRecord, RecordPayload, RecordUid};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Ledger is not reachable or disabled
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// This ledger implementation cannot append or revoke records
    #[error("Ledger is read-only: {0}")]
    ReadOnly(String),

    /// Transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ledger answered with something we could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Referenced record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// A fetched record that could not be decoded into the record schema.
///
/// Reported alongside the decodable records so a verification pass can
/// surface it as a finding instead of aborting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeFailure {
    /// Uid of the offending record, as reported by the ledger.
    pub uid: String,
    /// Why decoding failed.
    pub reason: String,
}

/// Result of a record query: decoded records plus per-record decode failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    /// Successfully decoded records.
    pub records: Vec<LedgerRecord>,
    /// Records skipped because their payload was malformed.
    pub undecodable: Vec<DecodeFailure>,
}

/// Capability contract for the external attestation ledger.
///
/// Submission is synchronous-result: `submit_record` returns only once the
/// ledger has acknowledged the append and assigned a uid. Retrying a failed
/// submit may create duplicate records; the caller owns reconciliation.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append one record and return its ledger-assigned uid.
    async fn submit_record(&self, payload: RecordPayload) -> Result<RecordUid, LedgerError>;

    /// Mark a record inactive. Never deletes; the record remains
    /// retrievable through a non-active query.
    async fn revoke_record(&self, uid: RecordUid) -> Result<(), LedgerError>;

    /// Fetch all records under the document's schema.
    ///
    /// With `active_only`, revoked records are excluded. Result order is
    /// not meaningful.
    async fn query_records(&self, active_only: bool) -> Result<RecordBatch, LedgerError>;
}
