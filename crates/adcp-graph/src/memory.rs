//! In-memory graph store implementing `NeighborSource`.
//!
//! Used by tests and for offline analysis of fixture files. Relations are kept
//! in insertion order, so query results are deterministic.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use regex::Regex;

use adcp_core::{Direction, Identity, NodeKey, RelationKind};

use crate::client::GraphError;
use crate::source::{NeighborRecord, NeighborSource, SearchMode};

#[derive(Debug, Clone)]
struct StoredRelation {
    source: NodeKey,
    target: NodeKey,
    kind: RelationKind,
}

/// A small, fully in-memory AD graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    identities: Vec<Identity>,
    by_name: HashMap<String, NodeKey>,
    relations: Vec<StoredRelation>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or fetch) an identity by name. Keys are dense, in insertion order.
    pub fn add_identity(&mut self, name: &str, label: &str) -> NodeKey {
        if let Some(&key) = self.by_name.get(name) {
            return key;
        }
        let key = NodeKey(self.identities.len() as i64);
        self.identities
            .push(Identity::new(key.0, name, vec![label.to_string()]));
        self.by_name.insert(name.to_string(), key);
        key
    }

    /// Add a relation between two existing identities. Returns `false` when
    /// either endpoint is unknown.
    pub fn add_relation(&mut self, source: &str, target: &str, kind: &str) -> bool {
        match (self.by_name.get(source), self.by_name.get(target)) {
            (Some(&source), Some(&target)) => {
                self.relations.push(StoredRelation {
                    source,
                    target,
                    kind: RelationKind::new(kind),
                });
                true
            }
            _ => false,
        }
    }

    pub fn identity_by_name(&self, name: &str) -> Option<&Identity> {
        self.by_name
            .get(name)
            .and_then(|key| self.identities.get(key.0 as usize))
    }

    pub fn node_count(&self) -> usize {
        self.identities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn get(&self, key: NodeKey) -> Option<&Identity> {
        usize::try_from(key.0)
            .ok()
            .and_then(|i| self.identities.get(i))
    }
}

#[async_trait]
impl NeighborSource for MemoryGraph {
    async fn relation_kinds(&self) -> Result<Vec<RelationKind>, GraphError> {
        let mut seen = HashSet::new();
        Ok(self
            .relations
            .iter()
            .filter(|r| seen.insert(r.kind.clone()))
            .map(|r| r.kind.clone())
            .collect())
    }

    async fn neighbors(
        &self,
        frontier: &[NodeKey],
        excluding: &HashSet<NodeKey>,
        direction: Direction,
        allowed: &[RelationKind],
    ) -> Result<Vec<NeighborRecord>, GraphError> {
        let frontier: HashSet<NodeKey> = frontier.iter().copied().collect();

        let mut results = Vec::new();
        for rel in &self.relations {
            let (near, far) = match direction {
                Direction::Forward => (rel.source, rel.target),
                Direction::Reverse => (rel.target, rel.source),
            };
            if !frontier.contains(&near) || excluding.contains(&far) || !allowed.contains(&rel.kind) {
                continue;
            }
            if let (Some(source), Some(target)) = (self.get(rel.source), self.get(rel.target)) {
                results.push(NeighborRecord {
                    source: source.clone(),
                    target: target.clone(),
                    kind: rel.kind.clone(),
                });
            }
        }
        Ok(results)
    }

    async fn search(&self, term: &str, mode: SearchMode) -> Result<Vec<Identity>, GraphError> {
        let pattern = match mode {
            SearchMode::Pattern => Some(
                Regex::new(&format!("^(?:{term})"))
                    .map_err(|e| GraphError::InvalidPattern(e.to_string()))?,
            ),
            _ => None,
        };

        let mut matches: Vec<Identity> = self
            .identities
            .iter()
            .filter(|id| match mode {
                SearchMode::Exact => id.name == term,
                SearchMode::StartsWith => id.name.starts_with(term),
                SearchMode::Contains => id.name.contains(term),
                SearchMode::Pattern => pattern.as_ref().is_some_and(|re| re.is_match(&id.name)),
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }

    async fn identity(&self, key: NodeKey) -> Result<Option<Identity>, GraphError> {
        Ok(self.get(key).cloned())
    }
}
