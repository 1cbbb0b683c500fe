//! Depth-bounded frontier expansion.
//!
//! Each round asks the store for every relation from the current frontier to
//! a node not yet visited. Nodes discovered in a round form the next
//! frontier, so no node is discovered twice. The visited set starts empty:
//! the root counts as discovered only once a relation leads back to it.

use std::collections::HashSet;

use adcp_core::{Direction, Identity, NodeKey, RelationKind};
use adcp_graph::NeighborSource;

use crate::error::Result;
use crate::graph::PathGraph;

/// Relation kinds followed from `root`. Mailbox (RBAC) relations are only
/// followed when the root is itself a mailbox principal.
pub async fn allowed_relations(source: &dyn NeighborSource, root: &Identity) -> Result<Vec<RelationKind>> {
    let mut kinds = source.relation_kinds().await?;
    if !root.is_mailbox_capable() {
        kinds.retain(|k| !k.is_mailbox());
    }
    Ok(kinds)
}

/// Expand the control graph around `root`, at most `max_depth` rounds.
///
/// Returns `None` when the root has no relation in `direction`.
pub async fn expand(
    source: &dyn NeighborSource,
    root: &Identity,
    direction: Direction,
    max_depth: usize,
) -> Result<Option<PathGraph>> {
    let allowed = allowed_relations(source, root).await?;
    tracing::debug!(root = %root.name, kinds = allowed.len(), "Relation allowlist");

    let mut graph = PathGraph::new();
    let mut visited: HashSet<NodeKey> = HashSet::new();
    let mut frontier = vec![root.key];

    for depth in 1..=max_depth {
        let rows = source.neighbors(&frontier, &visited, direction, &allowed).await?;
        if rows.is_empty() {
            tracing::debug!(depth, "Fixed point reached");
            break;
        }

        let relations = rows.len();
        let mut discovered = Vec::new();
        for row in rows {
            let far = row.far_end(direction).key;
            if visited.insert(far) {
                discovered.push(far);
            }
            graph.add_relation(row.source, row.target, row.kind);
        }

        tracing::info!(depth, relations, nodes = discovered.len(), "Expansion round");
        frontier = discovered;
        if depth == max_depth {
            tracing::warn!(max_depth, "Depth limit reached, control graph may be truncated");
        }
    }

    if graph.edge_count() == 0 {
        tracing::info!(root = %root.name, %direction, "Empty graph");
        return Ok(None);
    }
    Ok(Some(graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_graph::MemoryGraph;

    fn chain(len: usize) -> MemoryGraph {
        let mut g = MemoryGraph::new();
        for i in 0..len {
            g.add_identity(&format!("N{i}"), "group");
        }
        for i in 1..len {
            g.add_relation(&format!("N{i}"), &format!("N{}", i - 1), "GROUP_MEMBER");
        }
        g
    }

    #[tokio::test]
    async fn test_chain_fully_expanded() {
        let g = chain(5);
        let root = g.identity_by_name("N0").unwrap().clone();
        let graph = expand(&g, &root, Direction::Reverse, 20).await.unwrap().unwrap();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        // Discovery order follows the rounds.
        let names: Vec<&str> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["N1", "N0", "N2", "N3", "N4"]);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let g = chain(5);
        let root = g.identity_by_name("N0").unwrap().clone();
        let graph = expand(&g, &root, Direction::Reverse, 2).await.unwrap().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_wrong_direction_is_empty() {
        let g = chain(3);
        let root = g.identity_by_name("N0").unwrap().clone();
        assert!(expand(&g, &root, Direction::Forward, 20).await.unwrap().is_none());
        assert!(expand(&g, &root, Direction::Reverse, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cycle_through_root_keeps_every_edge() {
        let mut g = chain(3);
        g.add_relation("N0", "N2", "GROUP_MEMBER");
        let root = g.identity_by_name("N0").unwrap().clone();
        let graph = expand(&g, &root, Direction::Reverse, 20).await.unwrap().unwrap();
        assert_eq!(graph.node_count(), 3);
        // N1 -> N0, N2 -> N1, then N0 -> N2 closes the loop on the root.
        assert_eq!(graph.edge_count(), 3);
        let n0 = root.key;
        let n2 = g.identity_by_name("N2").unwrap().key;
        assert!(graph.edges().iter().any(|e| e.endpoints() == (n0, n2)));
    }

    #[tokio::test]
    async fn test_mutual_membership_with_root() {
        let mut g = MemoryGraph::new();
        g.add_identity("R", "group");
        g.add_identity("A", "group");
        g.add_relation("A", "R", "GROUP_MEMBER");
        g.add_relation("R", "A", "GROUP_MEMBER");

        let root = g.identity_by_name("R").unwrap().clone();
        let a = g.identity_by_name("A").unwrap().key;
        let graph = expand(&g, &root, Direction::Reverse, 20).await.unwrap().unwrap();
        let mut edges: Vec<(NodeKey, NodeKey)> = graph.edges().iter().map(|e| e.endpoints()).collect();
        edges.sort();
        let mut expected = vec![(a, root.key), (root.key, a)];
        expected.sort();
        assert_eq!(edges, expected);
    }

    #[tokio::test]
    async fn test_self_loop_on_root_terminates() {
        let mut g = chain(2);
        g.add_relation("N0", "N0", "GROUP_MEMBER");
        let root = g.identity_by_name("N0").unwrap().clone();
        let graph = expand(&g, &root, Direction::Reverse, 20).await.unwrap().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_mailbox_relations_need_mailbox_root() {
        let mut g = MemoryGraph::new();
        g.add_identity("cn=target", "user");
        g.add_identity("cn=owner", "user");
        g.add_identity("mbx@corp.local", "user");
        g.add_relation("cn=owner", "cn=target", "RBAC_SET_MBX");
        g.add_relation("cn=owner", "mbx@corp.local", "RBAC_SET_MBX");

        let plain = g.identity_by_name("cn=target").unwrap().clone();
        assert!(expand(&g, &plain, Direction::Reverse, 20).await.unwrap().is_none());

        let mailbox = g.identity_by_name("mbx@corp.local").unwrap().clone();
        let graph = expand(&g, &mailbox, Direction::Reverse, 20).await.unwrap().unwrap();
        assert_eq!(graph.edge_count(), 1);
    }
}
