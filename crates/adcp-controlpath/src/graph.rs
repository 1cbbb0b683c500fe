//! In-memory control graph built around a root principal.
//!
//! Nodes are kept in discovery order with a key → position index. Edges are
//! kept in insertion order; the simplifier relies on that order to produce
//! deterministic output.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use adcp_core::{Identity, NodeKey, RelationKind, RelationKinds};

/// A directed control edge. Before simplification `kinds` holds exactly one
/// relation; afterwards it holds every relation between the same endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ControlEdge {
    pub source: NodeKey,
    pub target: NodeKey,
    pub kinds: RelationKinds,
    /// Set when the relation is blocked by an explicit deny ACE.
    pub denied: bool,
}

impl ControlEdge {
    pub fn new(source: NodeKey, target: NodeKey, kind: RelationKind) -> Self {
        Self {
            source,
            target,
            kinds: RelationKinds::single(kind),
            denied: false,
        }
    }

    /// The synthetic `DENY_<kind>` edge recording a denied hop.
    pub fn denial(source: NodeKey, target: NodeKey, kind: &RelationKind) -> Self {
        Self {
            source,
            target,
            kinds: RelationKinds::single(kind.deny_tag()),
            denied: true,
        }
    }

    pub fn endpoints(&self) -> (NodeKey, NodeKey) {
        (self.source, self.target)
    }

    /// Whether this edge only carries synthetic deny tags.
    pub fn is_synthetic(&self) -> bool {
        !self.kinds.is_empty() && self.kinds.iter().all(|k| k.denied_kind().is_some())
    }
}

/// The control graph of one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathGraph {
    nodes: Vec<Identity>,
    #[serde(skip)]
    node_index: HashMap<NodeKey, usize>,
    edges: Vec<ControlEdge>,
    #[serde(skip)]
    edge_keys: HashSet<(NodeKey, NodeKey, String)>,
    /// Nodes whose every route to the root is blocked by a denial.
    no_links: HashSet<NodeKey>,
}

impl PathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node unless already present. Returns `true` if inserted.
    pub fn add_node(&mut self, identity: Identity) -> bool {
        if self.node_index.contains_key(&identity.key) {
            return false;
        }
        self.node_index.insert(identity.key, self.nodes.len());
        self.nodes.push(identity);
        true
    }

    /// Add an edge between two known nodes. An edge identical to one already
    /// present (same endpoints, same kinds) is dropped. Returns `true` if
    /// inserted.
    pub fn add_edge(&mut self, edge: ControlEdge) -> bool {
        if !self.contains_node(edge.source) || !self.contains_node(edge.target) {
            tracing::warn!(source = %edge.source, target = %edge.target, "Edge endpoint not in graph");
            return false;
        }
        if !self.edge_keys.insert(edge_key(&edge)) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Add both endpoints and the single-kind edge between them.
    pub fn add_relation(&mut self, source: Identity, target: Identity, kind: RelationKind) -> bool {
        let edge = ControlEdge::new(source.key, target.key, kind);
        self.add_node(source);
        self.add_node(target);
        self.add_edge(edge)
    }

    /// Swap the edge list, keeping nodes and NoLinks tags.
    pub(crate) fn replace_edges(mut self, edges: Vec<ControlEdge>) -> Self {
        self.edge_keys = edges.iter().map(edge_key).collect();
        self.edges = edges;
        self
    }

    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.node_index.contains_key(&key)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Identity> {
        self.node_index.get(&key).map(|&i| &self.nodes[i])
    }

    /// Position of a node in discovery order.
    pub fn position(&self, key: NodeKey) -> Option<usize> {
        self.node_index.get(&key).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Identity> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> &[Identity] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ControlEdge] {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [ControlEdge] {
        &mut self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn denied_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.denied).count()
    }

    pub fn tag_no_links(&mut self, key: NodeKey) -> bool {
        self.contains_node(key) && self.no_links.insert(key)
    }

    pub fn untag_no_links(&mut self, key: NodeKey) -> bool {
        self.no_links.remove(&key)
    }

    pub fn is_no_links(&self, key: NodeKey) -> bool {
        self.no_links.contains(&key)
    }

    pub fn no_links_count(&self) -> usize {
        self.no_links.len()
    }
}

fn edge_key(edge: &ControlEdge) -> (NodeKey, NodeKey, String) {
    (edge.source, edge.target, edge.kinds.joined())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(key: i64, name: &str) -> Identity {
        Identity::new(key, name, vec!["user".to_string()])
    }

    #[test]
    fn test_add_relation_registers_endpoints() {
        let mut g = PathGraph::new();
        assert!(g.add_relation(id(1, "A"), id(2, "B"), RelationKind::from("GROUP_MEMBER")));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.position(NodeKey(2)), Some(1));
        assert_eq!(g.node_by_name("B").unwrap().key, NodeKey(2));
    }

    #[test]
    fn test_identical_edges_collapse() {
        let mut g = PathGraph::new();
        g.add_relation(id(1, "A"), id(2, "B"), RelationKind::from("GROUP_MEMBER"));
        assert!(!g.add_relation(id(1, "A"), id(2, "B"), RelationKind::from("GROUP_MEMBER")));
        assert!(g.add_relation(id(1, "A"), id(2, "B"), RelationKind::from("WRITE_DACL")));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_edge_with_unknown_endpoint_rejected() {
        let mut g = PathGraph::new();
        g.add_node(id(1, "A"));
        assert!(!g.add_edge(ControlEdge::new(NodeKey(1), NodeKey(9), RelationKind::from("AD_OWNER"))));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_no_links_requires_known_node() {
        let mut g = PathGraph::new();
        g.add_node(id(1, "A"));
        assert!(g.tag_no_links(NodeKey(1)));
        assert!(!g.tag_no_links(NodeKey(1)));
        assert!(!g.tag_no_links(NodeKey(2)));
        assert_eq!(g.no_links_count(), 1);
    }

    #[test]
    fn test_denial_edge() {
        let e = ControlEdge::denial(NodeKey(1), NodeKey(2), &RelationKind::from("GROUP_MEMBER"));
        assert!(e.denied);
        assert!(e.is_synthetic());
        assert_eq!(e.kinds.joined(), "DENY_GROUP_MEMBER");
        assert!(!ControlEdge::new(NodeKey(1), NodeKey(2), RelationKind::from("X")).is_synthetic());
    }
}
