//! Deny propagation.
//!
//! Explicit deny ACEs block a relation between two principals. The blocked
//! relation need not be a direct edge: with A member of B member of C, a deny
//! on A → C cancels the membership A inherits through B. So every node's
//! reachable hops are enumerated and checked against the deny table:
//!
//! 1. direct edges matching a denial are flagged `denied`;
//! 2. each denied hop is materialized as a synthetic `DENY_<kind>` edge;
//! 3. a node whose paths to the target are all cancelled is tagged NoLinks.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use adcp_core::{Identity, NodeKey, RelationKind};

use crate::denylist::DenyTable;
use crate::error::Result;
use crate::graph::{ControlEdge, PathGraph};
use crate::types::Deadline;

/// Path frames walked between deadline checks.
const DEADLINE_STRIDE: usize = 1024;

/// What deny propagation did to one graph.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DenySummary {
    /// Whether a deny table was available.
    pub applied: bool,
    /// Direct edges flagged denied.
    pub flagged_edges: usize,
    /// Synthetic deny edges added.
    pub deny_edges: usize,
    /// Nodes tagged NoLinks.
    pub no_links: usize,
}

/// A graph after deny propagation.
#[derive(Debug, Clone)]
pub struct DenyOutcome {
    pub graph: PathGraph,
    pub summary: DenySummary,
}

/// One relation reachable from a start node. Hops through transitive
/// relations keep the start node as their source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub source: NodeKey,
    pub target: NodeKey,
    pub kind: RelationKind,
}

/// Outgoing relations per node, synthetic deny edges excluded.
pub struct RelationIndex {
    outgoing: BTreeMap<NodeKey, BTreeMap<NodeKey, Vec<RelationKind>>>,
}

impl RelationIndex {
    pub fn build(graph: &PathGraph) -> Self {
        let mut outgoing: BTreeMap<NodeKey, BTreeMap<NodeKey, Vec<RelationKind>>> = BTreeMap::new();
        for edge in graph.edges() {
            for kind in edge.kinds.iter().filter(|k| k.denied_kind().is_none()) {
                let kinds = outgoing
                    .entry(edge.source)
                    .or_default()
                    .entry(edge.target)
                    .or_default();
                if !kinds.contains(kind) {
                    kinds.push(kind.clone());
                }
            }
        }
        Self { outgoing }
    }

    /// Nodes with at least one outgoing relation, in key order.
    pub fn sources(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.outgoing.keys().copied()
    }

    /// Visit every hop reachable from `start`: each direct relation, plus
    /// the relations of nodes reached through transitive relations. The
    /// visitor gets the hop target and kind; the hop source is `start`.
    ///
    /// A node already on the current path is not re-entered, so cycles of
    /// transitive relations terminate. Distinct paths to the same hop each
    /// visit it once. The number of paths can grow exponentially with the
    /// depth of nested memberships, so `deadline` is polled while walking.
    pub fn visit_hops<F>(&self, start: NodeKey, deadline: Option<&Deadline>, mut visit: F) -> Result<()>
    where
        F: FnMut(NodeKey, &RelationKind),
    {
        struct Frame {
            node: NodeKey,
            on_path: HashSet<NodeKey>,
        }

        let mut stack = vec![Frame {
            node: start,
            on_path: HashSet::from([start]),
        }];
        let mut popped = 0usize;

        while let Some(frame) = stack.pop() {
            popped += 1;
            if popped % DEADLINE_STRIDE == 0 {
                if let Some(deadline) = deadline {
                    deadline.check()?;
                }
            }
            let Some(targets) = self.outgoing.get(&frame.node) else {
                continue;
            };
            for (&target, kinds) in targets {
                for kind in kinds {
                    visit(target, kind);
                    if kind.is_transitive() && !frame.on_path.contains(&target) {
                        let mut on_path = frame.on_path.clone();
                        on_path.insert(target);
                        stack.push(Frame { node: target, on_path });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Per-source result of checking hops against the deny table.
#[derive(Debug, Clone, Default)]
pub struct Reach {
    /// Hops landing on the target, minus denied hops.
    pub path_count: i64,
    /// Distinct denied hops.
    pub denied: Vec<Hop>,
}

impl Reach {
    /// Every route to the target was cancelled by a denial.
    pub fn is_no_links(&self) -> bool {
        !self.denied.is_empty() && self.path_count == 0
    }
}

/// Count `source`'s paths to `target` and collect its denied hops.
pub fn reach(
    index: &RelationIndex,
    graph: &PathGraph,
    denials: &DenyTable,
    source: NodeKey,
    target: NodeKey,
    deadline: Option<&Deadline>,
) -> Result<Reach> {
    let mut reach = Reach::default();
    index.visit_hops(source, deadline, |hop_target, kind| {
        if hop_target == target {
            reach.path_count += 1;
        }
        if is_denied(graph, denials, source, hop_target, kind) {
            reach.path_count -= 1;
            if !reach.denied.iter().any(|h| h.target == hop_target && &h.kind == kind) {
                reach.denied.push(Hop {
                    source,
                    target: hop_target,
                    kind: kind.clone(),
                });
            }
        }
    })?;
    Ok(reach)
}

/// Apply `denials` to `graph` relative to `target` (the request root).
///
/// Without a deny table the graph is returned untouched. Fails with
/// `Timeout` once `deadline` passes.
pub fn apply_denials(
    mut graph: PathGraph,
    denials: Option<&DenyTable>,
    target: &Identity,
    deadline: Option<&Deadline>,
) -> Result<DenyOutcome> {
    let Some(denials) = denials else {
        tracing::warn!("No deny ACE applied");
        return Ok(DenyOutcome {
            graph,
            summary: DenySummary::default(),
        });
    };

    let mut summary = DenySummary {
        applied: true,
        ..DenySummary::default()
    };

    let flagged: Vec<usize> = graph
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.denied && e.kinds.iter().any(|k| is_denied(&graph, denials, e.source, e.target, k)))
        .map(|(i, _)| i)
        .collect();
    for i in flagged {
        let edge = &mut graph.edges_mut()[i];
        edge.denied = true;
        tracing::debug!(source = %edge.source, target = %edge.target, kinds = %edge.kinds.joined(), "Denied edge");
        summary.flagged_edges += 1;
    }

    let index = RelationIndex::build(&graph);
    let mut deny_edges = Vec::new();
    let mut no_links = Vec::new();
    for source in index.sources() {
        if let Some(deadline) = deadline {
            deadline.check()?;
        }
        let outcome = reach(&index, &graph, denials, source, target.key, deadline)?;
        if outcome.is_no_links() {
            no_links.push(source);
        }
        deny_edges.extend(
            outcome
                .denied
                .iter()
                .map(|hop| ControlEdge::denial(hop.source, hop.target, &hop.kind)),
        );
    }

    for edge in deny_edges {
        if graph.add_edge(edge) {
            summary.deny_edges += 1;
        }
    }
    for key in no_links {
        if graph.tag_no_links(key) {
            if let Some(node) = graph.node(key) {
                tracing::debug!(node = %node.name, "NoLinks");
            }
            summary.no_links += 1;
        }
    }

    tracing::info!(
        flagged = summary.flagged_edges,
        deny_edges = summary.deny_edges,
        no_links = summary.no_links,
        "Deny ACEs applied"
    );

    Ok(DenyOutcome { graph, summary })
}

fn is_denied(graph: &PathGraph, denials: &DenyTable, source: NodeKey, target: NodeKey, kind: &RelationKind) -> bool {
    match (graph.node(source), graph.node(target)) {
        (Some(s), Some(t)) => denials.is_denied(&s.name, &t.name, kind),
        _ => false,
    }
}
