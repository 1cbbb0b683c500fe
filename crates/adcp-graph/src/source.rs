//! The graph-query collaborator contract.

use std::collections::HashSet;

use async_trait::async_trait;

use adcp_core::{Direction, Identity, NodeKey, RelationKind};

use crate::client::GraphError;

/// One relationship returned by a neighbor query, oriented source → target
/// as stored (independent of the traversal direction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    pub source: Identity,
    pub target: Identity,
    pub kind: RelationKind,
}

impl NeighborRecord {
    /// The endpoint reached when walking this record in `direction`.
    pub fn far_end(&self, direction: Direction) -> &Identity {
        match direction {
            Direction::Forward => &self.target,
            Direction::Reverse => &self.source,
        }
    }
}

/// How a name lookup compares the search term with display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    StartsWith,
    Contains,
    /// Regular expression anchored at the start of the name. Used for alias
    /// patterns.
    Pattern,
}

/// A store able to answer the queries the control-path engine needs.
///
/// Implementations must be thread-safe: batch mode shares one source across
/// concurrent requests.
#[async_trait]
pub trait NeighborSource: Send + Sync {
    /// Every relation kind present in the store.
    async fn relation_kinds(&self) -> Result<Vec<RelationKind>, GraphError>;

    /// All one-hop relationships, walked in `direction`, from a node in
    /// `frontier` to a node outside `excluding`, restricted to `allowed` kinds.
    async fn neighbors(
        &self,
        frontier: &[NodeKey],
        excluding: &HashSet<NodeKey>,
        direction: Direction,
        allowed: &[RelationKind],
    ) -> Result<Vec<NeighborRecord>, GraphError>;

    /// Identities whose display name matches `term`.
    async fn search(&self, term: &str, mode: SearchMode) -> Result<Vec<Identity>, GraphError>;

    /// Look up a single identity by store key.
    async fn identity(&self, key: NodeKey) -> Result<Option<Identity>, GraphError>;
}
