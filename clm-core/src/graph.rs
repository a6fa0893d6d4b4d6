//! Section graph construction and topological sequencing.
//!
//! The document tree is held as an arena of sections keyed by local id, with
//! parent/children stored as id references. Construction validates the forest
//! shape (no dangling parents, no cycles) before any submission can begin.

use std::collections::{HashMap, HashSet};

use crate::types::Section;

/// Error types for graph construction and sequencing.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A section's parent id does not exist in the table
    #[error("Section \"{section}\" references missing parent \"{parent}\"")]
    DanglingParent { section: String, parent: String },

    /// Parent links do not terminate at a root
    #[error("Cycle detected following parent links from \"{section}\"")]
    Cycle { section: String },

    /// Preferred order references an id not present in the table (strict mode)
    #[error("Preferred order references unknown section \"{0}\"")]
    MissingSection(String),

    /// Two sections share the same local id
    #[error("Duplicate section id \"{0}\"")]
    DuplicateSection(String),
}

/// In-memory representation of the document tree.
///
/// Built from a flat section table plus a declared preferred iteration order.
/// The preferred order drives deterministic tie-breaking in the sequencer;
/// correctness does not depend on it.
#[derive(Debug, Clone)]
pub struct SectionGraph {
    sections: HashMap<String, Section>,
    children: HashMap<String, Vec<String>>,
    preferred_order: Vec<String>,
}

impl SectionGraph {
    /// Build a graph from a flat section table and a preferred order.
    ///
    /// Derives every section's children list by scanning parent references,
    /// then validates the forest invariants. Fails before any submission
    /// work can proceed against an invalid structure.
    pub fn build(
        sections: Vec<Section>,
        preferred_order: Vec<String>,
    ) -> Result<Self, GraphError> {
        let mut table: HashMap<String, Section> = HashMap::with_capacity(sections.len());
        for section in sections {
            if table.contains_key(&section.id) {
                return Err(GraphError::DuplicateSection(section.id));
            }
            table.insert(section.id.clone(), section);
        }

        let graph = Self {
            children: Self::build_children(&table, &preferred_order)?,
            sections: table,
            preferred_order,
        };
        graph.detect_cycles()?;
        Ok(graph)
    }

    /// Derive children lists, ordered by the preferred order.
    fn build_children(
        table: &HashMap<String, Section>,
        preferred_order: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError> {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for id in Self::scan_order(table, preferred_order) {
            let section = &table[&id];
            if let Some(parent) = &section.parent {
                if !table.contains_key(parent) {
                    return Err(GraphError::DanglingParent {
                        section: section.id.clone(),
                        parent: parent.clone(),
                    });
                }
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(section.id.clone());
            }
        }
        Ok(children)
    }

    /// Verify that following parent links from every section terminates at a
    /// root within `len()` hops, guaranteeing forest shape.
    fn detect_cycles(&self) -> Result<(), GraphError> {
        let max_hops = self.sections.len();
        for section in self.sections.values() {
            let mut current = section;
            let mut hops = 0;
            while let Some(parent_id) = &current.parent {
                hops += 1;
                if hops > max_hops {
                    return Err(GraphError::Cycle {
                        section: section.id.clone(),
                    });
                }
                // Dangling parents are rejected during construction.
                match self.sections.get(parent_id) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Deterministic scan order: preferred order first, then any sections it
    /// does not cover, in sorted id order.
    fn scan_order(table: &HashMap<String, Section>, preferred_order: &[String]) -> Vec<String> {
        let mut seen = HashSet::with_capacity(table.len());
        let mut order = Vec::with_capacity(table.len());
        for id in preferred_order {
            if table.contains_key(id) && seen.insert(id.clone()) {
                order.push(id.clone());
            }
        }
        let mut remaining: Vec<String> = table
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        remaining.sort();
        order.extend(remaining);
        order
    }

    /// Number of sections in the graph.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the graph holds no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Look up a section by local id.
    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    /// The declared preferred order.
    pub fn preferred_order(&self) -> &[String] {
        &self.preferred_order
    }

    /// Root sections (no parent), in deterministic scan order.
    pub fn roots(&self) -> Vec<&Section> {
        Self::scan_order(&self.sections, &self.preferred_order)
            .iter()
            .filter_map(|id| self.sections.get(id))
            .filter(|s| s.is_root())
            .collect()
    }

    /// Derived children ids of a section, in preferred order.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Produce a parent-before-child total order over every section.
    ///
    /// Depth-first visit driven by the preferred order: each id's parent is
    /// visited first, so no section is ever emitted before its parent. Among
    /// unconstrained sections the output matches the preferred order. Ids in
    /// the preferred order that are absent from the table are skipped, which
    /// supports partial/incremental graphs.
    pub fn sequence(&self) -> Vec<&Section> {
        // Infallible in non-strict mode.
        self.sequence_inner(false).unwrap_or_default()
    }

    /// Like [`sequence`](Self::sequence) but fails with
    /// [`GraphError::MissingSection`] if the preferred order references an id
    /// not present in the table.
    pub fn sequence_strict(&self) -> Result<Vec<&Section>, GraphError> {
        self.sequence_inner(true)
    }

    fn sequence_inner(&self, strict: bool) -> Result<Vec<&Section>, GraphError> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.sections.len());
        let mut output: Vec<&Section> = Vec::with_capacity(self.sections.len());

        for id in Self::scan_order(&self.sections, &self.preferred_order) {
            self.visit(&id, &mut visited, &mut output);
        }
        if strict {
            for id in &self.preferred_order {
                if !self.sections.contains_key(id) {
                    return Err(GraphError::MissingSection(id.clone()));
                }
            }
        }
        Ok(output)
    }

    fn visit<'a>(
        &'a self,
        id: &str,
        visited: &mut HashSet<&'a str>,
        output: &mut Vec<&'a Section>,
    ) {
        if visited.contains(id) {
            return;
        }
        let Some(section) = self.sections.get(id) else {
            return;
        };
        if let Some(parent) = &section.parent {
            if self.sections.contains_key(parent) {
                self.visit(parent, visited, output);
            }
        }
        visited.insert(&section.id);
        output.push(section);
    }
}
