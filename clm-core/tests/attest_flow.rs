//! Write-path tests over the built-in document: sequencing, parent
//! resolution, content digests, and the root aggregate.

use clm_core::{
    aggregate_root, content_digest, Digest, Document, MemoryLedger, RecordSubmitter,
    RecordUid, SubmitterConfig,
};

const EXPECTED_SECTIONS: &[&str] = &[
    "preamble", "conclusion",
    "1", "1.0", "1.1", "1.2", "1.3", "1.4",
    "2", "2.1", "2.1.1", "2.1.2", "2.1.3", "2.1.4",
    "2.2", "2.2.1", "2.2.2", "2.2.3",
    "2.3", "2.3.1", "2.3.2", "2.3.3",
    "3", "3.1", "3.1.1", "3.1.2",
    "3.2", "3.2.1", "3.2.2",
    "3.3", "3.3.1", "3.3.2",
    "4", "4.1", "4.2", "4.2.1", "4.2.2", "4.2.3", "4.2.4",
];

const ROOT_SECTIONS: &[&str] = &["preamble", "1", "2", "3", "4", "conclusion"];

const EXPECTED_CHILDREN: &[(&str, &[&str])] = &[
    ("1", &["1.0", "1.1", "1.2", "1.3", "1.4"]),
    ("2", &["2.1", "2.2", "2.3"]),
    ("2.1", &["2.1.1", "2.1.2", "2.1.3", "2.1.4"]),
    ("2.2", &["2.2.1", "2.2.2", "2.2.3"]),
    ("2.3", &["2.3.1", "2.3.2", "2.3.3"]),
    ("3", &["3.1", "3.2", "3.3"]),
    ("3.1", &["3.1.1", "3.1.2"]),
    ("3.2", &["3.2.1", "3.2.2"]),
    ("3.3", &["3.3.1", "3.3.2"]),
    ("4", &["4.1", "4.2"]),
    ("4.2", &["4.2.1", "4.2.2", "4.2.3", "4.2.4"]),
];

#[test]
fn sequence_is_complete_and_topological() {
    let graph = Document::builtin().graph().unwrap();
    let sequence = graph.sequence();
    let order: Vec<&str> = sequence.iter().map(|s| s.id.as_str()).collect();

    assert_eq!(order.len(), EXPECTED_SECTIONS.len());
    for id in EXPECTED_SECTIONS {
        assert!(order.contains(id), "section \"{id}\" in attestation order");
    }

    // Parents strictly before children.
    for (index, section) in sequence.iter().enumerate() {
        if let Some(parent) = &section.parent {
            let parent_index = order
                .iter()
                .position(|id| id == parent)
                .unwrap_or_else(|| panic!("parent \"{parent}\" missing from order"));
            assert!(
                parent_index < index,
                "\"{}\" parent \"{parent}\" appears before it",
                section.id
            );
        }
    }
}

#[test]
fn fixed_document_ordering_constraints() {
    let graph = Document::builtin().graph().unwrap();
    let order: Vec<String> = graph.sequence().iter().map(|s| s.id.clone()).collect();
    let position = |id: &str| order.iter().position(|x| x == id).unwrap();

    for child in ["1.0", "1.1", "1.2", "1.3", "1.4"] {
        assert!(position("1") < position(child));
    }
    for child in ["2.1.1", "2.1.2", "2.1.3", "2.1.4"] {
        assert!(position("2.1") < position(child));
    }
}

#[test]
fn expected_hierarchy_holds_in_graph() {
    let graph = Document::builtin().graph().unwrap();
    for (parent, children) in EXPECTED_CHILDREN {
        let derived: Vec<&str> = graph.children(parent).iter().map(String::as_str).collect();
        assert_eq!(derived.as_slice(), *children, "children of \"{parent}\"");
        for child in *children {
            let section = graph.get(child).unwrap();
            assert_eq!(section.parent.as_deref(), Some(*parent));
        }
    }
}

#[tokio::test]
async fn submission_binds_roots_to_zero_reference() {
    let document = Document::builtin();
    let ledger = MemoryLedger::new();
    let submitter = RecordSubmitter::new(&ledger, SubmitterConfig::immediate());
    let report = submitter.submit_graph(&document.graph().unwrap()).await.unwrap();

    for id in ROOT_SECTIONS {
        let record = report.record_for(id).unwrap();
        assert!(record.parent.is_zero(), "\"{id}\" is a root section");
    }
    for id in EXPECTED_SECTIONS {
        if ROOT_SECTIONS.contains(id) {
            continue;
        }
        let record = report.record_for(id).unwrap();
        assert!(!record.parent.is_zero(), "\"{id}\" has a parent uid");
    }
}

#[tokio::test]
async fn submission_resolves_parent_uids() {
    let document = Document::builtin();
    let ledger = MemoryLedger::new();
    let submitter = RecordSubmitter::new(&ledger, SubmitterConfig::immediate());
    let report = submitter.submit_graph(&document.graph().unwrap()).await.unwrap();

    for (parent, children) in EXPECTED_CHILDREN {
        let parent_uid = report.record_for(parent).unwrap().uid;
        for child in *children {
            let child_record = report.record_for(child).unwrap();
            assert_eq!(
                child_record.parent, parent_uid,
                "\"{child}\" parent resolves to \"{parent}\""
            );
        }
    }

    // Uids are unique across the record set.
    let mut uids: Vec<RecordUid> = report.records.iter().map(|r| r.uid).collect();
    uids.sort_by_key(|u| *u.as_bytes());
    uids.dedup();
    assert_eq!(uids.len(), report.records.len());
}

#[tokio::test]
async fn container_sections_carry_zero_digest() {
    let document = Document::builtin();
    let ledger = MemoryLedger::new();
    let submitter = RecordSubmitter::new(&ledger, SubmitterConfig::immediate());
    let report = submitter.submit_graph(&document.graph().unwrap()).await.unwrap();

    for section in &document.sections {
        let record = report.record_for(&section.id).unwrap();
        if section.is_container() {
            assert_eq!(record.content_digest, Digest::ZERO, "container \"{}\"", section.id);
        } else {
            assert_ne!(record.content_digest, Digest::ZERO, "leaf \"{}\"", section.id);
            assert_eq!(
                record.content_digest,
                content_digest(section.content.as_deref())
            );
        }
    }
}

#[tokio::test]
async fn root_aggregate_matches_sequence_digests() {
    let document = Document::builtin();
    let ledger = MemoryLedger::new();
    let submitter = RecordSubmitter::new(&ledger, SubmitterConfig::immediate());
    let report = submitter.submit_graph(&document.graph().unwrap()).await.unwrap();

    let digests: Vec<Digest> = report.records.iter().map(|r| r.content_digest).collect();
    assert_eq!(report.root, aggregate_root(&digests));

    // Identical pass over an identical document yields an identical root.
    let second_ledger = MemoryLedger::new();
    let second = RecordSubmitter::new(&second_ledger, SubmitterConfig::immediate())
        .submit_graph(&document.graph().unwrap())
        .await
        .unwrap();
    assert_eq!(report.root, second.root);
}
