//! Integrity verification of the fetched record set.
//!
//! Fetches the active records, reconstructs the section structure from their
//! declared parent references, and checks every structural and content
//! invariant against the expected document. All checks are independent and
//! cumulative: a single run reports every violation found, never just the
//! first. Malformed records are findings, not fatal errors.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::ledger::{DecodeFailure, Ledger, LedgerError};
use crate::resolver::UidIndex;
use crate::types::{Digest, LedgerRecord, RecordUid};

/// Which verification rule a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityRule {
    /// An expected section has no record
    MissingSection,
    /// A record's section id is not in the expected set
    UnexpectedSection,
    /// A record's parent uid is not any fetched record's uid
    ParentUnresolved,
    /// A record's parent resolves to the wrong section
    HierarchyMismatch,
    /// A non-container section carries no content
    MissingContent,
    /// A non-container section carries the zero content digest
    MissingContentDigest,
    /// A root section declares a non-zero parent, or vice versa
    RootMismatch,
}

impl IntegrityRule {
    /// Short rule name for report output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSection => "missing_section",
            Self::UnexpectedSection => "unexpected_section",
            Self::ParentUnresolved => "parent_unresolved",
            Self::HierarchyMismatch => "hierarchy_mismatch",
            Self::MissingContent => "missing_content",
            Self::MissingContentDigest => "missing_content_digest",
            Self::RootMismatch => "root_mismatch",
        }
    }
}

/// A single verification finding: one rule, one section, expected vs actual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityViolation {
    /// Local id of the section the finding concerns.
    pub section_id: String,
    /// Which rule was violated.
    pub rule: IntegrityRule,
    /// What the expected document requires.
    pub expected: String,
    /// What the record set actually holds.
    pub actual: String,
}

/// Complete result of one verification pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Every violation found, across all rules.
    pub violations: Vec<IntegrityViolation>,
    /// Fetched records that could not be decoded.
    pub decode_failures: Vec<DecodeFailure>,
    /// Number of decodable records checked.
    pub records_checked: usize,
    /// Section ids observed as roots (zero or unresolvable parent reference;
    /// the latter is best-effort display and is also reported as a
    /// [`IntegrityRule::ParentUnresolved`] violation).
    pub observed_roots: Vec<String>,
}

impl IntegrityReport {
    /// Whether the pass found no violations and no undecodable records.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.decode_failures.is_empty()
    }

    /// Violations concerning one section.
    pub fn violations_for(&self, section_id: &str) -> Vec<&IntegrityViolation> {
        self.violations
            .iter()
            .filter(|v| v.section_id == section_id)
            .collect()
    }

    /// Violations of one rule.
    pub fn violations_of(&self, rule: IntegrityRule) -> Vec<&IntegrityViolation> {
        self.violations.iter().filter(|v| v.rule == rule).collect()
    }
}

/// Structural expectations derived from a document.
#[derive(Debug, Clone)]
struct Expectations {
    ids: Vec<String>,
    /// child id -> expected parent id; roots are absent.
    hierarchy: HashMap<String, String>,
    containers: HashSet<String>,
}

/// Verifies a fetched record set against an expected document structure.
pub struct IntegrityVerifier {
    expected: Expectations,
}

impl IntegrityVerifier {
    /// Build a verifier for the given document.
    pub fn for_document(document: &Document) -> Self {
        let mut hierarchy = HashMap::new();
        let mut containers = HashSet::new();
        for section in &document.sections {
            if let Some(parent) = &section.parent {
                hierarchy.insert(section.id.clone(), parent.clone());
            }
            if section.is_container() {
                containers.insert(section.id.clone());
            }
        }
        Self {
            expected: Expectations {
                ids: document.section_order.clone(),
                hierarchy,
                containers,
            },
        }
    }

    /// Fetch the active record set and verify it.
    pub async fn verify(&self, ledger: &dyn Ledger) -> Result<IntegrityReport, LedgerError> {
        let batch = ledger.query_records(true).await?;
        let mut report = self.check_records(&batch.records);
        report.decode_failures = batch.undecodable;
        Ok(report)
    }

    /// Verify an already-fetched record set.
    pub fn check_records(&self, records: &[LedgerRecord]) -> IntegrityReport {
        let mut report = IntegrityReport {
            records_checked: records.len(),
            ..IntegrityReport::default()
        };

        let index = UidIndex::from_records(records);
        let by_id: HashMap<&str, &LedgerRecord> = records
            .iter()
            .map(|r| (r.payload.section_id.as_str(), r))
            .collect();
        let expected_ids: HashSet<&str> =
            self.expected.ids.iter().map(String::as_str).collect();

        // Completeness: no missing sections.
        for id in &self.expected.ids {
            if !by_id.contains_key(id.as_str()) {
                report.violations.push(IntegrityViolation {
                    section_id: id.clone(),
                    rule: IntegrityRule::MissingSection,
                    expected: "record present".into(),
                    actual: "no record".into(),
                });
            }
        }

        for record in records {
            let id = record.payload.section_id.as_str();

            // Completeness: no unexpected sections.
            if !expected_ids.contains(id) {
                report.violations.push(IntegrityViolation {
                    section_id: id.to_string(),
                    rule: IntegrityRule::UnexpectedSection,
                    expected: "id in expected section set".into(),
                    actual: format!("unexpected id \"{id}\""),
                });
                continue;
            }

            // Content and digest requirements for non-containers.
            if !self.expected.containers.contains(id) {
                if record.payload.content.is_empty() {
                    report.violations.push(IntegrityViolation {
                        section_id: id.to_string(),
                        rule: IntegrityRule::MissingContent,
                        expected: "non-empty content".into(),
                        actual: "empty content".into(),
                    });
                }
                if record.payload.content_digest == Digest::ZERO {
                    report.violations.push(IntegrityViolation {
                        section_id: id.to_string(),
                        rule: IntegrityRule::MissingContentDigest,
                        expected: "non-zero content digest".into(),
                        actual: Digest::ZERO.to_string(),
                    });
                }
            }

            // Parent reference resolution and hierarchy placement.
            let expected_parent = self.expected.hierarchy.get(id);
            let declared = record.payload.parent;
            match expected_parent {
                None => {
                    if !declared.is_zero() {
                        report.violations.push(IntegrityViolation {
                            section_id: id.to_string(),
                            rule: IntegrityRule::RootMismatch,
                            expected: format!("root section with parent {}", RecordUid::ZERO),
                            actual: format!("parent {declared}"),
                        });
                    }
                }
                Some(parent_id) => {
                    if declared.is_zero() {
                        report.violations.push(IntegrityViolation {
                            section_id: id.to_string(),
                            rule: IntegrityRule::RootMismatch,
                            expected: format!("child of \"{parent_id}\""),
                            actual: "zero parent reference".into(),
                        });
                    } else {
                        match index.section_for(declared) {
                            None => {
                                report.violations.push(IntegrityViolation {
                                    section_id: id.to_string(),
                                    rule: IntegrityRule::ParentUnresolved,
                                    expected: "parent uid of some fetched record".into(),
                                    actual: format!("unknown uid {declared}"),
                                });
                            }
                            Some(resolved) if resolved != parent_id => {
                                report.violations.push(IntegrityViolation {
                                    section_id: id.to_string(),
                                    rule: IntegrityRule::HierarchyMismatch,
                                    expected: format!("parent \"{parent_id}\""),
                                    actual: format!("parent \"{resolved}\""),
                                });
                            }
                            Some(_) => {}
                        }
                    }
                }
            }

            // Best-effort root view: zero or unresolvable parent reference.
            if index.parent_section(record).is_none() {
                report.observed_roots.push(id.to_string());
            }
        }

        if report.is_clean() {
            tracing::info!(
                records = report.records_checked,
                "Integrity verification clean"
            );
        } else {
            tracing::warn!(
                records = report.records_checked,
                violations = report.violations.len(),
                undecodable = report.decode_failures.len(),
                "Integrity verification found defects"
            );
        }
        report
    }
}
