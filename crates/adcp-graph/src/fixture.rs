//! Test fixtures: small AD graphs described by two TSV files.
//!
//! ```text
//! nodes.tsv   name<TAB>label
//! rels.tsv    source<TAB>target<TAB>relation
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::client::GraphError;
use crate::memory::MemoryGraph;

/// A named principal in a fixture.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FixtureNode {
    pub name: String,
    pub label: String,
}

/// A relation between two fixture principals, by name.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FixtureRelation {
    pub source: String,
    pub target: String,
    pub kind: String,
}

/// A validated fixture: every relation endpoint is a declared node and every
/// label and relation kind is a plain identifier.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub nodes: Vec<FixtureNode>,
    pub relations: Vec<FixtureRelation>,
}

impl Fixture {
    /// Build and validate a fixture from in-memory parts.
    pub fn new(nodes: Vec<FixtureNode>, relations: Vec<FixtureRelation>) -> Result<Self, GraphError> {
        let fixture = Self { nodes, relations };
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load a fixture from a node file and a relation file.
    pub fn from_tsv(nodes: &Path, relations: &Path) -> Result<Self, GraphError> {
        let nodes = read_tsv::<FixtureNode>(nodes)?;
        let relations = read_tsv::<FixtureRelation>(relations)?;
        tracing::debug!(nodes = nodes.len(), relations = relations.len(), "Fixture parsed");
        Self::new(nodes, relations)
    }

    /// Materialize the fixture as an in-memory graph. Keys are assigned in
    /// declaration order starting at 0.
    pub fn to_memory_graph(&self) -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        for node in &self.nodes {
            graph.add_identity(&node.name, &node.label);
        }
        for rel in &self.relations {
            graph.add_relation(&rel.source, &rel.target, &rel.kind);
        }
        graph
    }

    fn validate(&self) -> Result<(), GraphError> {
        let mut names = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(GraphError::Fixture(format!("duplicate node {}", node.name)));
            }
            if !is_identifier(&node.label) {
                return Err(GraphError::Fixture(format!("invalid label {}", node.label)));
            }
        }

        for rel in &self.relations {
            for endpoint in [&rel.source, &rel.target] {
                if !names.contains(endpoint.as_str()) {
                    return Err(GraphError::Fixture(format!("unknown node {endpoint}")));
                }
            }
            if !is_identifier(&rel.kind) {
                return Err(GraphError::Fixture(format!("invalid relation {}", rel.kind)));
            }
        }

        Ok(())
    }
}

/// Labels and relation types are interpolated into Cypher, so they are
/// restricted to `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn read_tsv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, GraphError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
