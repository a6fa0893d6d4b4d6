//! Read-path tests: integrity verification of fetched record sets,
//! revocation semantics, and the supersession lifecycle.

use async_trait::async_trait;

use clm_core::{
    DecodeFailure, Document, IntegrityRule, IntegrityVerifier, Ledger, LedgerError,
    LedgerRecord, MemoryLedger, RecordBatch, RecordPayload, RecordSubmitter, RecordUid,
    Section, SubmitterConfig,
};

async fn populated_ledger(document: &Document) -> MemoryLedger {
    let ledger = MemoryLedger::new();
    RecordSubmitter::new(&ledger, SubmitterConfig::immediate())
        .submit_graph(&document.graph().unwrap())
        .await
        .unwrap();
    ledger
}

async fn record_for(ledger: &MemoryLedger, section_id: &str) -> LedgerRecord {
    ledger
        .query_records(true)
        .await
        .unwrap()
        .records
        .into_iter()
        .find(|r| r.payload.section_id == section_id)
        .unwrap()
}

#[tokio::test]
async fn full_round_trip_is_clean() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;

    let report = IntegrityVerifier::for_document(&document)
        .verify(&ledger)
        .await
        .unwrap();

    assert!(report.is_clean(), "violations: {:?}", report.violations);
    assert_eq!(report.records_checked, 39);
    assert_eq!(report.observed_roots.len(), 6);
}

#[tokio::test]
async fn missing_section_is_a_single_violation() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;

    let target = record_for(&ledger, "4.2.3").await;
    ledger.revoke_record(target.uid).await.unwrap();

    let report = IntegrityVerifier::for_document(&document)
        .verify(&ledger)
        .await
        .unwrap();

    assert_eq!(report.violations.len(), 1);
    let violation = &report.violations[0];
    assert_eq!(violation.rule, IntegrityRule::MissingSection);
    assert_eq!(violation.section_id, "4.2.3");
}

#[tokio::test]
async fn dangling_parent_uid_is_flagged_not_accepted() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;
    let mut records = ledger.query_records(true).await.unwrap().records;

    // Point one child at a uid that no fetched record carries.
    let bogus = "0x00000000000000000000000000000000000000000000000000000000000000ee"
        .parse::<RecordUid>()
        .unwrap();
    let child = records
        .iter_mut()
        .find(|r| r.payload.section_id == "2.1.1")
        .unwrap();
    child.payload.parent = bogus;

    let report = IntegrityVerifier::for_document(&document).check_records(&records);

    let unresolved = report.violations_of(IntegrityRule::ParentUnresolved);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].section_id, "2.1.1");

    // Degraded best-effort display lists it among roots, but the violation
    // above means it is never silently accepted as correctly parented.
    assert!(report.observed_roots.contains(&"2.1.1".to_string()));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn wrong_parent_is_a_hierarchy_mismatch() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;
    let mut records = ledger.query_records(true).await.unwrap().records;

    let conclusion_uid = records
        .iter()
        .find(|r| r.payload.section_id == "conclusion")
        .unwrap()
        .uid;
    let child = records
        .iter_mut()
        .find(|r| r.payload.section_id == "3.1.2")
        .unwrap();
    child.payload.parent = conclusion_uid;

    let report = IntegrityVerifier::for_document(&document).check_records(&records);
    let mismatches = report.violations_of(IntegrityRule::HierarchyMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].section_id, "3.1.2");
    assert!(mismatches[0].actual.contains("conclusion"));
}

#[tokio::test]
async fn unexpected_section_is_reported() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;

    let stray = Section {
        id: "99".into(),
        title: "Stray".into(),
        subtitle: None,
        parent: None,
        immutable: false,
        content: Some("Not part of the document".into()),
    };
    ledger
        .submit_record(RecordPayload::for_section(&stray, RecordUid::ZERO))
        .await
        .unwrap();

    let report = IntegrityVerifier::for_document(&document)
        .verify(&ledger)
        .await
        .unwrap();
    let unexpected = report.violations_of(IntegrityRule::UnexpectedSection);
    assert_eq!(unexpected.len(), 1);
    assert_eq!(unexpected[0].section_id, "99");
}

#[tokio::test]
async fn revocation_is_not_destructive() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;

    let target = record_for(&ledger, "preamble").await;
    ledger.revoke_record(target.uid).await.unwrap();

    let active = ledger.query_records(true).await.unwrap();
    assert!(active
        .records
        .iter()
        .all(|r| r.payload.section_id != "preamble"));

    let all = ledger.query_records(false).await.unwrap();
    let revoked = all
        .records
        .iter()
        .find(|r| r.uid == target.uid)
        .unwrap();
    assert!(revoked.revoked);
}

#[tokio::test]
async fn supersession_assigns_a_new_uid() {
    let document = Document::builtin();
    let ledger = populated_ledger(&document).await;

    // An "edit" is revoke + resubmit: a brand-new record, never mutation.
    let old = record_for(&ledger, "conclusion").await;
    ledger.revoke_record(old.uid).await.unwrap();

    let amended = Section {
        id: "conclusion".into(),
        title: "Conclusion".into(),
        subtitle: None,
        parent: None,
        immutable: false,
        content: Some("Amended closing statement.".into()),
    };
    let new_uid = ledger
        .submit_record(RecordPayload::for_section(&amended, RecordUid::ZERO))
        .await
        .unwrap();
    assert_ne!(new_uid, old.uid);

    let report = IntegrityVerifier::for_document(&document)
        .verify(&ledger)
        .await
        .unwrap();
    assert!(report.is_clean(), "violations: {:?}", report.violations);
}

/// Stub ledger returning a canned batch, for decode-failure reporting.
struct CannedLedger {
    batch: RecordBatch,
}

#[async_trait]
impl Ledger for CannedLedger {
    async fn submit_record(&self, _payload: RecordPayload) -> Result<RecordUid, LedgerError> {
        Err(LedgerError::ReadOnly("canned".into()))
    }

    async fn revoke_record(&self, _uid: RecordUid) -> Result<(), LedgerError> {
        Err(LedgerError::ReadOnly("canned".into()))
    }

    async fn query_records(&self, _active_only: bool) -> Result<RecordBatch, LedgerError> {
        Ok(self.batch.clone())
    }
}

#[tokio::test]
async fn undecodable_records_are_findings_not_failures() {
    let document = Document::builtin();
    let populated = populated_ledger(&document).await;
    let mut batch = populated.query_records(true).await.unwrap();
    batch.undecodable.push(DecodeFailure {
        uid: "0xdead".into(),
        reason: "missing field \"sectionId\"".into(),
    });

    let ledger = CannedLedger { batch };
    let report = IntegrityVerifier::for_document(&document)
        .verify(&ledger)
        .await
        .unwrap();

    // The malformed record is reported, the rest are still fully checked.
    assert_eq!(report.decode_failures.len(), 1);
    assert!(report.violations.is_empty());
    assert_eq!(report.records_checked, 39);
    assert!(!report.is_clean());
}
