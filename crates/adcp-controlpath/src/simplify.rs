//! Parallel-edge simplification: one edge per ordered node pair.

use std::collections::HashMap;

use adcp_core::NodeKey;

use crate::graph::{ControlEdge, PathGraph};

/// Merge every group of edges sharing (source, target) into one edge.
///
/// The merged edge lists the union of kinds in first-seen order and is
/// denied if any member was. Edges keep the position of the first edge of
/// their group. Applying this twice is the same as applying it once.
pub fn simplify(graph: PathGraph) -> PathGraph {
    let mut order: Vec<(NodeKey, NodeKey)> = Vec::new();
    let mut merged: HashMap<(NodeKey, NodeKey), ControlEdge> = HashMap::new();

    for edge in graph.edges() {
        match merged.get_mut(&edge.endpoints()) {
            Some(existing) => {
                existing.kinds.extend(edge.kinds.iter().cloned());
                existing.denied |= edge.denied;
            }
            None => {
                order.push(edge.endpoints());
                merged.insert(edge.endpoints(), edge.clone());
            }
        }
    }

    let before = graph.edge_count();
    let edges: Vec<ControlEdge> = order.iter().filter_map(|pair| merged.remove(pair)).collect();
    tracing::debug!(before, after = edges.len(), "Parallel edges merged");
    graph.replace_edges(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_core::{Identity, RelationKind};

    fn id(key: i64) -> Identity {
        Identity::new(key, format!("N{key}"), vec![])
    }

    #[test]
    fn test_parallel_edges_merge() {
        let mut g = PathGraph::new();
        g.add_relation(id(1), id(2), RelationKind::from("X"));
        g.add_relation(id(1), id(3), RelationKind::from("Y"));
        g.add_relation(id(1), id(2), RelationKind::from("Y"));
        g.add_relation(id(2), id(1), RelationKind::from("X"));

        let g = simplify(g);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.edges()[0].kinds.joined(), "X,Y");
        assert_eq!(g.edges()[1].kinds.joined(), "Y");
        assert_eq!(g.edges()[2].endpoints(), (NodeKey(2), NodeKey(1)));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_denied_flag_is_ored() {
        let mut g = PathGraph::new();
        g.add_relation(id(1), id(2), RelationKind::from("GROUP_MEMBER"));
        g.add_edge(ControlEdge::denial(NodeKey(1), NodeKey(2), &RelationKind::from("GROUP_MEMBER")));

        let g = simplify(g);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edges()[0].denied);
        assert_eq!(g.edges()[0].kinds.joined(), "GROUP_MEMBER,DENY_GROUP_MEMBER");
    }

    #[test]
    fn test_idempotent() {
        let mut g = PathGraph::new();
        g.add_relation(id(1), id(2), RelationKind::from("X"));
        g.add_relation(id(1), id(2), RelationKind::from("Y"));
        g.tag_no_links(NodeKey(1));

        let once = simplify(g);
        let twice = simplify(once.clone());
        assert_eq!(once.edges(), twice.edges());
        assert!(twice.is_no_links(NodeKey(1)));
    }
}
