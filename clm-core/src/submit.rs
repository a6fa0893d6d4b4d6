//! Sequential record submission.
//!
//! Each record's parent reference depends on the uid the ledger assigned to
//! an already-submitted record, so the pass is strictly sequential: submit,
//! register the returned uid, then move to the next section. A failure
//! aborts the remaining queue and surfaces everything submitted so far; the
//! ledger is append-only, so there is no rollback short of explicit
//! revocation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::aggregate_root;
use crate::graph::SectionGraph;
use crate::hash::content_digest;
use crate::ledger::{Ledger, LedgerError};
use crate::resolver::{ResolverError, UidResolver};
use crate::types::{Digest, RecordPayload, SubmittedRecord, SCHEMA_VERSION};

/// Error types for the submission pass.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Sequencing invariant violated; internal bug, not user-recoverable
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// An immutable section is already recorded with different content
    #[error("Immutable section \"{section_id}\" already recorded with digest {recorded}, refusing to resubmit as {planned}")]
    ImmutableConflict {
        section_id: String,
        recorded: Digest,
        planned: Digest,
    },

    /// The pre-submission query of existing records failed
    #[error("Could not check existing records: {0}")]
    Preflight(#[source] LedgerError),

    /// A ledger append failed; the remaining queue was aborted
    #[error("Submission of \"{section_id}\" failed after {} records: {source}", .completed.len())]
    Ledger {
        section_id: String,
        /// Records acknowledged before the failure, for reconciliation.
        completed: Vec<SubmittedRecord>,
        #[source]
        source: LedgerError,
    },
}

/// Configuration for a submission pass.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Delay inserted between consecutive submissions, respecting
    /// collaborator-side ordering/nonce constraints.
    pub record_delay: Duration,
    /// Query existing records first and refuse to resubmit an immutable
    /// section with a different content digest.
    pub check_immutable_conflicts: bool,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            record_delay: Duration::from_secs(1),
            check_immutable_conflicts: true,
        }
    }
}

impl SubmitterConfig {
    /// Config suited to tests and in-process ledgers: no pacing delay.
    pub fn immediate() -> Self {
        Self {
            record_delay: Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Outcome of a completed submission pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    /// Schema version bound into every record.
    pub schema_version: u16,
    /// Per-section results, in submission order.
    pub records: Vec<SubmittedRecord>,
    /// Aggregate digest over the content digests in submission order.
    pub root: Digest,
    /// When the pass completed.
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl SubmissionReport {
    /// Look up the record submitted for a section.
    pub fn record_for(&self, section_id: &str) -> Option<&SubmittedRecord> {
        self.records.iter().find(|r| r.section_id == section_id)
    }
}

/// Drives the write path: sequence, hash, resolve, submit, aggregate.
pub struct RecordSubmitter<'a> {
    ledger: &'a dyn Ledger,
    config: SubmitterConfig,
}

impl<'a> RecordSubmitter<'a> {
    /// Create a submitter over a ledger with the given configuration.
    pub fn new(ledger: &'a dyn Ledger, config: SubmitterConfig) -> Self {
        Self { ledger, config }
    }

    /// Submit every section of the graph in topological order.
    ///
    /// The resolver table is owned by this single pass; uids are registered
    /// strictly in submission order and each parent reference is resolved
    /// from a uid assigned earlier in the same pass.
    pub async fn submit_graph(&self, graph: &SectionGraph) -> Result<SubmissionReport, SubmitError> {
        let sequence = graph.sequence();

        if self.config.check_immutable_conflicts {
            self.check_immutable_conflicts(&sequence).await?;
        }

        let mut resolver = UidResolver::new();
        let mut records: Vec<SubmittedRecord> = Vec::with_capacity(sequence.len());

        for (index, section) in sequence.iter().enumerate() {
            let parent = resolver.resolve_parent(section)?;
            let payload = RecordPayload::for_section(section, parent);
            let content_digest = payload.content_digest;

            tracing::info!(
                section = %section.id,
                parent = %parent,
                digest = %content_digest,
                "Submitting record"
            );

            let uid = match self.ledger.submit_record(payload).await {
                Ok(uid) => uid,
                Err(source) => {
                    tracing::error!(
                        section = %section.id,
                        completed = records.len(),
                        error = %source,
                        "Submission failed, aborting remaining queue"
                    );
                    return Err(SubmitError::Ledger {
                        section_id: section.id.clone(),
                        completed: records,
                        source,
                    });
                }
            };

            resolver.register(&section.id, uid)?;
            records.push(SubmittedRecord {
                section_id: section.id.clone(),
                uid,
                content_digest,
                parent,
            });

            if !self.config.record_delay.is_zero() && index + 1 < sequence.len() {
                tokio::time::sleep(self.config.record_delay).await;
            }
        }

        let digests: Vec<Digest> = records.iter().map(|r| r.content_digest).collect();
        let root = aggregate_root(&digests);
        tracing::info!(records = records.len(), root = %root, "Submission pass complete");

        Ok(SubmissionReport {
            schema_version: SCHEMA_VERSION,
            records,
            root,
            submitted_at: chrono::Utc::now(),
        })
    }

    /// Refuse to resubmit immutable sections whose recorded digest differs
    /// from the planned digest.
    async fn check_immutable_conflicts(
        &self,
        sequence: &[&crate::types::Section],
    ) -> Result<(), SubmitError> {
        let batch = self
            .ledger
            .query_records(true)
            .await
            .map_err(SubmitError::Preflight)?;
        if batch.records.is_empty() {
            return Ok(());
        }

        for section in sequence {
            if !section.immutable {
                continue;
            }
            let planned = content_digest(section.content.as_deref());
            let recorded = batch
                .records
                .iter()
                .filter(|r| r.payload.immutable && r.payload.section_id == section.id)
                .map(|r| r.payload.content_digest)
                .next_back();
            if let Some(recorded) = recorded {
                if recorded != planned {
                    return Err(SubmitError::ImmutableConflict {
                        section_id: section.id.clone(),
                        recorded,
                        planned,
                    });
                }
            }
        }
        Ok(())
    }
}
