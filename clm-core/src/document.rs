//! Document loading.
//!
//! The document description is an input artifact: a flat section table plus
//! a declared section order, read from a strict JSON schema. The built-in
//! CLM v1.0 document is embedded in the crate so callers always have a
//! well-formed fallback when no external document or deployment descriptor
//! is available.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::{GraphError, SectionGraph};
use crate::types::{RecordUid, Section};

/// The embedded CLM v1.0 document description.
const BUILTIN_DOCUMENT: &str = include_str!("../data/clm-v1.json");

/// Error types for document loading.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Could not read the document file
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid JSON for the schema
    #[error("Failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document parsed but is internally inconsistent
    #[error("Invalid document: {0}")]
    Invalid(String),
}

/// Document-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentMeta {
    /// Document version number.
    pub version: u32,
    /// Human-readable version label.
    pub version_label: String,
    /// Root digest of the superseded version; zero for the genesis document.
    pub predecessor: RecordUid,
}

/// A versioned, hierarchical document description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// Version metadata.
    pub meta: DocumentMeta,
    /// Flat section table.
    pub sections: Vec<Section>,
    /// Preferred iteration order over section ids.
    pub section_order: Vec<String>,
}

impl Document {
    /// The built-in CLM v1.0 document.
    pub fn builtin() -> Self {
        // The embedded document is validated by the crate's own tests.
        serde_json::from_str(BUILTIN_DOCUMENT).expect("embedded clm-v1.json is valid")
    }

    /// Parse a document from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Read and parse a document file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check internal consistency: unique ids, order covers every section.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut ids = HashSet::with_capacity(self.sections.len());
        for section in &self.sections {
            if !ids.insert(section.id.as_str()) {
                return Err(DocumentError::Invalid(format!(
                    "duplicate section id \"{}\"",
                    section.id
                )));
            }
        }
        for id in &self.section_order {
            if !ids.contains(id.as_str()) {
                return Err(DocumentError::Invalid(format!(
                    "section order references unknown id \"{id}\""
                )));
            }
        }
        let ordered: HashSet<&str> = self.section_order.iter().map(String::as_str).collect();
        for section in &self.sections {
            if !ordered.contains(section.id.as_str()) {
                return Err(DocumentError::Invalid(format!(
                    "section \"{}\" missing from section order",
                    section.id
                )));
            }
        }
        Ok(())
    }

    /// Build the section graph for this document.
    pub fn graph(&self) -> Result<SectionGraph, GraphError> {
        SectionGraph::build(self.sections.clone(), self.section_order.clone())
    }

    /// Ids of root sections, in document order.
    pub fn root_ids(&self) -> Vec<&str> {
        self.section_order
            .iter()
            .filter_map(|id| self.sections.iter().find(|s| &s.id == id))
            .filter(|s| s.is_root())
            .map(|s| s.id.as_str())
            .collect()
    }
}
