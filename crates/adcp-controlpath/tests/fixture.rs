//! End-to-end control-path computation over fixture graphs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use adcp_controlpath::deny::apply_denials;
use adcp_controlpath::export::{export, ExportGraph, ExportOptions};
use adcp_controlpath::simplify::simplify;
use adcp_controlpath::{
    ControlEdge, ControlPathEngine, ControlPathRequest, DenyCache, DenyTable, FileDenySource, PathGraph,
};
use adcp_core::{Direction, Identity, NodeKey, RelationKind};
use adcp_graph::{Fixture, GraphError, MemoryGraph, NeighborRecord, NeighborSource, SearchMode};

/// Nine groups TEST_1..TEST_9, each with ten members TEST_k0..TEST_k9,
/// chained TEST_9 → … → TEST_1 by membership, plus ten ordinary control
/// relations.
fn write_fixture(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut nodes = String::new();
    let mut rels = String::new();

    for k in 1..=9 {
        nodes.push_str(&format!("TEST_{k}\tgroup\n"));
        for j in 0..=9 {
            nodes.push_str(&format!("TEST_{k}{j}\tuser\n"));
            rels.push_str(&format!("TEST_{k}{j}\tTEST_{k}\tGROUP_MEMBER\n"));
        }
        rels.push_str(&format!("TEST_{k}0\tTEST_{k}\tGENERIC_ALL\n"));
    }
    for k in 1..=8 {
        rels.push_str(&format!("TEST_{}\tTEST_{k}\tGROUP_MEMBER\n", k + 1));
    }
    rels.push_str("TEST_9\tTEST_8\tPRIMARY_GROUP\n");
    rels.push_str("TEST_30\tTEST_21\tWRITE_OWNER\n");

    let nodes_path = dir.join("nodes.tsv");
    let rels_path = dir.join("rels.tsv");
    std::fs::write(&nodes_path, nodes).unwrap();
    std::fs::write(&rels_path, rels).unwrap();
    (nodes_path, rels_path)
}

/// `<workdir>/Relations/test.deny.csv`, UTF-16LE with BOM.
fn write_denials(workdir: &Path, rows: &[(&str, &str, &str)]) {
    let mut text = String::from("dnMaster:START_ID,dnSlave:END_ID,keyword:TYPE\n");
    for (source, target, kind) in rows {
        text.push_str(&format!("{source},{target},{kind}\n"));
    }
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }

    let relations = workdir.join("Relations");
    std::fs::create_dir_all(&relations).unwrap();
    std::fs::write(relations.join("test.deny.csv"), bytes).unwrap();
}

fn load_fixture(dir: &Path) -> MemoryGraph {
    let (nodes, rels) = write_fixture(dir);
    Fixture::from_tsv(&nodes, &rels).unwrap().to_memory_graph()
}

#[tokio::test]
async fn test_chained_groups_with_one_denial() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_fixture(dir.path());
    assert_eq!(store.node_count(), 99);
    assert_eq!(store.relation_count(), 109);

    write_denials(dir.path(), &[("TEST_20", "TEST_1", "GROUP_MEMBER")]);
    let cache = Arc::new(DenyCache::new(Arc::new(FileDenySource::new(dir.path()))));

    let root = store.identity_by_name("TEST_1").unwrap().clone();
    let engine = ControlPathEngine::new(Arc::new(store))
        .with_deny_cache(cache)
        .with_max_depth(20);
    let result = engine
        .control_graph(ControlPathRequest::new(root, Direction::Reverse))
        .await
        .unwrap();

    let graph = result.graph.as_ref().unwrap();
    assert_eq!(graph.node_count(), 99);
    assert_eq!(graph.edge_count(), 100);
    assert_eq!(graph.no_links_count(), 1);
    assert_eq!(graph.denied_edge_count(), 1);

    let test_20 = graph.node_by_name("TEST_20").unwrap().key;
    let test_1 = graph.node_by_name("TEST_1").unwrap().key;
    assert!(graph.is_no_links(test_20));
    let denied: Vec<&ControlEdge> = graph.edges().iter().filter(|e| e.denied).collect();
    assert_eq!(denied[0].endpoints(), (test_20, test_1));
    assert_eq!(denied[0].kinds.joined(), "DENY_GROUP_MEMBER");

    assert_eq!(result.stats.initial.edges, 109);
    assert_eq!(result.stats.filtered.edges, 110);
    assert_eq!(result.deny.deny_edges, 1);
    assert_eq!(result.deny.flagged_edges, 0);

    // Simplifying again changes nothing.
    let again = simplify(graph.clone());
    assert_eq!(again.edges(), graph.edges());

    let shown = export(graph, &ExportOptions::default());
    assert_eq!((shown.nodes.len(), shown.links.len()), (99, 100));
    assert!(shown
        .links
        .iter()
        .any(|l| l.rels == vec!["DENY_GROUP_MEMBER".to_string(), "DENY".to_string()]));

    // Hiding denials drops TEST_20 and both of its links.
    let (hidden_options, _) = ExportOptions::parse("-deny");
    let hidden = export(graph, &hidden_options);
    assert_eq!((hidden.nodes.len(), hidden.links.len()), (98, 98));
    assert!(hidden.nodes.iter().all(|n| n.name != "TEST_20"));
}

#[tokio::test]
async fn test_root_without_relations_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_fixture(dir.path());
    // Nothing is a member of TEST_55.
    let root = store.identity_by_name("TEST_55").unwrap().clone();

    let result = ControlPathEngine::new(Arc::new(store))
        .control_graph(ControlPathRequest::new(root, Direction::Reverse))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result.stats.simplified.nodes, 0);
}

#[tokio::test]
async fn test_forward_from_member() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_fixture(dir.path());
    let root = store.identity_by_name("TEST_90").unwrap().clone();

    let result = ControlPathEngine::new(Arc::new(store))
        .control_graph(ControlPathRequest::new(root, Direction::Forward))
        .await
        .unwrap();
    let graph = result.graph.unwrap();
    // TEST_90 → TEST_9 → TEST_8 → … → TEST_1
    assert_eq!(graph.node_count(), 10);
    // GROUP_MEMBER+GENERIC_ALL and GROUP_MEMBER+PRIMARY_GROUP are merged.
    assert_eq!(graph.edge_count(), 9);
    assert_eq!(result.stats.initial.edges, 11);
}

#[test]
fn test_parallel_edges_one_denied() {
    let a = Identity::new(1, "S", vec!["user".to_string()]);
    let b = Identity::new(2, "T", vec!["group".to_string()]);
    let mut graph = PathGraph::new();
    graph.add_relation(a.clone(), b.clone(), RelationKind::from("A"));
    graph.add_edge(ControlEdge {
        denied: true,
        ..ControlEdge::new(a.key, b.key, RelationKind::from("B"))
    });

    let graph = simplify(graph);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edges()[0].kinds.joined(), "A,B");
    assert!(graph.edges()[0].denied);
}

#[tokio::test]
async fn test_deny_then_simplify_is_noop_without_parallels_or_denials() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_fixture(dir.path());
    let root = store.identity_by_name("TEST_1").unwrap().clone();
    let graph = adcp_controlpath::expand::expand(&store, &root, Direction::Reverse, 20)
        .await
        .unwrap()
        .unwrap();
    let graph = simplify(graph);

    let table = DenyTable::new();
    let outcome = apply_denials(graph.clone(), Some(&table), &root, None).unwrap();
    let after = simplify(outcome.graph);
    assert_eq!(after.edges(), graph.edges());
    assert_eq!(after.no_links_count(), 0);
}

/// Records the far ends returned by every neighbor query.
struct Recording {
    inner: MemoryGraph,
    rounds: Mutex<Vec<HashSet<NodeKey>>>,
}

#[async_trait]
impl NeighborSource for Recording {
    async fn relation_kinds(&self) -> Result<Vec<RelationKind>, GraphError> {
        self.inner.relation_kinds().await
    }

    async fn neighbors(
        &self,
        frontier: &[NodeKey],
        excluding: &HashSet<NodeKey>,
        direction: Direction,
        allowed: &[RelationKind],
    ) -> Result<Vec<NeighborRecord>, GraphError> {
        let rows = self.inner.neighbors(frontier, excluding, direction, allowed).await?;
        let found = rows.iter().map(|r| r.far_end(direction).key).collect();
        self.rounds.lock().unwrap().push(found);
        Ok(rows)
    }

    async fn search(&self, term: &str, mode: SearchMode) -> Result<Vec<Identity>, GraphError> {
        self.inner.search(term, mode).await
    }

    async fn identity(&self, key: NodeKey) -> Result<Option<Identity>, GraphError> {
        self.inner.identity(key).await
    }
}

#[tokio::test]
async fn test_each_round_discovers_only_new_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let inner = load_fixture(dir.path());
    let root = inner.identity_by_name("TEST_1").unwrap().clone();
    let source = Recording {
        inner,
        rounds: Mutex::new(Vec::new()),
    };

    adcp_controlpath::expand::expand(&source, &root, Direction::Reverse, 20)
        .await
        .unwrap()
        .unwrap();

    let rounds = source.rounds.lock().unwrap();
    // Nine productive rounds, then the fixed point.
    assert_eq!(rounds.len(), 10);
    assert!(rounds[9].is_empty());

    let mut seen = HashSet::from([root.key]);
    for found in rounds.iter() {
        assert!(found.iter().all(|key| seen.insert(*key)));
    }
    assert_eq!(seen.len(), 99);
}

#[tokio::test]
async fn test_export_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_fixture(dir.path());
    let root = store.identity_by_name("TEST_3").unwrap().clone();
    let result = ControlPathEngine::new(Arc::new(store))
        .control_graph(ControlPathRequest::new(root, Direction::Reverse))
        .await
        .unwrap();

    let path = dir.path().join("test_3.json");
    let exported = export(result.graph.as_ref().unwrap(), &ExportOptions::default());
    exported.write_json_file(&path).unwrap();
    assert_eq!(ExportGraph::from_json_file(&path).unwrap(), exported);
}
