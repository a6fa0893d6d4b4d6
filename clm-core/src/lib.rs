//! Attestation graph builder and integrity verifier for the Core Logic
//! Module (CLM), a hierarchical, versioned document whose sections are
//! individually content-addressed and chained through an append-only
//! attestation ledger.
//!
//! # Write path
//!
//! [`SectionGraph`] validates the document tree and produces a
//! parent-before-child submission order; [`RecordSubmitter`] binds a content
//! digest and resolved parent uid into each record, submits it through the
//! [`Ledger`] collaborator, and aggregates the per-section digests into a
//! whole-document root fingerprint.
//!
//! # Read / audit path
//!
//! [`IntegrityVerifier`] fetches the current record set, reconstructs the
//! structure from the returned parent references, and reports every
//! structural or content violation in one pass.
//!
//! # Example
//!
//! ```ignore
//! use clm_core::{Document, IntegrityVerifier, MemoryLedger, RecordSubmitter, SubmitterConfig};
//!
//! let document = Document::builtin();
//! let graph = document.graph()?;
//!
//! let ledger = MemoryLedger::new();
//! let submitter = RecordSubmitter::new(&ledger, SubmitterConfig::immediate());
//! let report = submitter.submit_graph(&graph).await?;
//! println!("root: {}", report.root);
//!
//! let audit = IntegrityVerifier::for_document(&document).verify(&ledger).await?;
//! assert!(audit.is_clean());
//! ```

pub mod aggregate;
pub mod config;
pub mod document;
pub mod graph;
pub mod hash;
pub mod ledger;
pub mod resolver;
pub mod submit;
pub mod types;
pub mod verify;

// Re-export main types
pub use aggregate::aggregate_root;
pub use config::{active_config, chain_config, ChainConfig, DeploymentInfo};
pub use document::{Document, DocumentError, DocumentMeta};
pub use graph::{GraphError, SectionGraph};
pub use hash::content_digest;
pub use ledger::{
    DecodeFailure, EasScanLedger, Ledger, LedgerError, MemoryLedger, RecordBatch,
};
pub use resolver::{ResolverError, UidIndex, UidResolver};
pub use submit::{RecordSubmitter, SubmissionReport, SubmitError, SubmitterConfig};
pub use types::{
    Digest, LedgerRecord, RecordPayload, RecordUid, Section, SubmittedRecord, SCHEMA_VERSION,
};
pub use verify::{IntegrityReport, IntegrityRule, IntegrityVerifier, IntegrityViolation};
