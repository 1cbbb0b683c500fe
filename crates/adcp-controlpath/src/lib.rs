//! adcp-controlpath: Control-path computation for Active Directory graphs.
//!
//! Given a root principal, expands the graph of principals that control it
//! (or that it controls), applies explicit deny ACEs, and merges parallel
//! edges. The result can be exported as JSON and converted to graph-tool
//! formats.

pub mod convert;
pub mod deny;
pub mod denylist;
pub mod error;
pub mod expand;
pub mod export;
pub mod graph;
pub mod resolve;
pub mod simplify;
pub mod types;

pub use deny::{DenyOutcome, DenySummary};
pub use denylist::{DenyCache, DenySource, DenyTable, FileDenySource, StaticDenySource};
pub use error::{ControlPathError, DenyError};
pub use graph::{ControlEdge, PathGraph};
pub use types::{ControlPathRequest, ControlPathResult, Deadline, GraphStats, StageStats};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use adcp_graph::NeighborSource;

/// Default number of expansion rounds.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// The control-path computation engine.
///
/// Clone is cheap: the graph source and deny cache are shared.
#[derive(Clone)]
pub struct ControlPathEngine {
    source: Arc<dyn NeighborSource>,
    denials: Arc<DenyCache>,
    max_depth: usize,
    timeout: Option<Duration>,
}

impl ControlPathEngine {
    /// Create an engine with no denial data and the default depth.
    pub fn new(source: Arc<dyn NeighborSource>) -> Self {
        Self {
            source,
            denials: Arc::new(DenyCache::disabled()),
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
        }
    }

    /// Use a session deny cache.
    pub fn with_deny_cache(mut self, denials: Arc<DenyCache>) -> Self {
        self.denials = denials;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Abort requests running longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn source(&self) -> &Arc<dyn NeighborSource> {
        &self.source
    }

    /// Compute the control graph of `request.root`.
    ///
    /// Orchestrates: expand → deny propagation → simplify. A root with no
    /// relation in the requested direction yields a result with no graph.
    pub async fn control_graph(&self, request: ControlPathRequest) -> error::Result<ControlPathResult> {
        let Some(limit) = request.timeout_secs.map(Duration::from_secs).or(self.timeout) else {
            return self.run(request, None).await;
        };
        let deadline = Deadline::after(limit);
        tokio::time::timeout(limit, self.run(request, Some(deadline)))
            .await
            .map_err(|_| ControlPathError::Timeout {
                max_seconds: limit.as_secs(),
            })?
    }

    async fn run(&self, request: ControlPathRequest, deadline: Option<Deadline>) -> error::Result<ControlPathResult> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let max_depth = request.max_depth.unwrap_or(self.max_depth);
        tracing::info!(
            %request_id,
            root = %request.root.name,
            direction = %request.direction,
            max_depth,
            "Computing control graph"
        );

        let mut stats = GraphStats::default();
        let mut deny = DenySummary::default();

        let stage = Instant::now();
        let expanded = expand::expand(self.source.as_ref(), &request.root, request.direction, max_depth).await?;
        tracing::debug!(elapsed_ms = stage.elapsed().as_millis() as u64, "Expansion done");

        let graph = match expanded {
            Some(graph) => {
                stats.initial = StageStats::of(&graph);

                let stage = Instant::now();
                let table = self.denials.table().await?;
                let outcome = deny::apply_denials(graph, table.as_deref(), &request.root, deadline.as_ref())?;
                stats.filtered = StageStats::of(&outcome.graph);
                deny = outcome.summary;
                tracing::debug!(elapsed_ms = stage.elapsed().as_millis() as u64, "Deny propagation done");

                let simplified = simplify::simplify(outcome.graph);
                stats.simplified = StageStats::of(&simplified);
                Some(simplified)
            }
            None => None,
        };

        let computation_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            %request_id,
            nodes = stats.simplified.nodes,
            edges = stats.simplified.edges,
            computation_ms,
            "Control graph computed"
        );

        Ok(ControlPathResult {
            request_id,
            root: request.root,
            direction: request.direction,
            graph,
            stats,
            deny,
            computation_ms,
            computed_at: Utc::now(),
        })
    }

    /// Compute several control graphs concurrently, at most `concurrency` at
    /// a time. Results are returned in request order.
    pub async fn control_graphs(
        &self,
        requests: Vec<ControlPathRequest>,
        concurrency: usize,
    ) -> Vec<error::Result<ControlPathResult>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let engine = self.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ControlPathError::Task(e.to_string()))?;
                engine.control_graph(request).await
            }));
        }

        tracing::info!(requests = handles.len(), concurrency, "Batch started");

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Control graph task panicked");
                    Err(ControlPathError::Task(e.to_string()))
                }
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_core::{DenyRecord, Direction, Identity};
    use adcp_graph::MemoryGraph;

    fn engine_for(g: MemoryGraph) -> ControlPathEngine {
        ControlPathEngine::new(Arc::new(g))
    }

    fn root(g: &MemoryGraph, name: &str) -> Identity {
        g.identity_by_name(name).unwrap().clone()
    }

    fn parallel() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_identity("T", "group");
        g.add_identity("S", "user");
        g.add_relation("S", "T", "A");
        g.add_relation("S", "T", "B");
        g
    }

    #[tokio::test]
    async fn test_parallel_edges_merged_and_denied() {
        let g = parallel();
        let request = ControlPathRequest::new(root(&g, "T"), Direction::Reverse);
        let cache = Arc::new(DenyCache::new(Arc::new(StaticDenySource(vec![DenyRecord::new("S", "T", "A")]))));
        let engine = engine_for(g).with_deny_cache(cache);

        let result = engine.control_graph(request).await.unwrap();
        let graph = result.graph.unwrap();
        // The synthetic DENY_A edge is parallel too, so it joins the merge.
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].kinds.joined(), "A,B,DENY_A");
        assert!(graph.edges()[0].denied);
        assert_eq!(result.stats.initial, StageStats { nodes: 2, edges: 2 });
        assert!(result.deny.applied);
    }

    #[tokio::test]
    async fn test_empty_root_is_not_an_error() {
        let g = parallel();
        let request = ControlPathRequest::new(root(&g, "T"), Direction::Forward);
        let result = engine_for(g).control_graph(request).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.stats, GraphStats::default());
    }

    #[tokio::test]
    async fn test_without_denials() {
        let g = parallel();
        let request = ControlPathRequest::new(root(&g, "T"), Direction::Reverse);
        let result = engine_for(g).control_graph(request).await.unwrap();
        assert!(!result.deny.applied);
        assert_eq!(result.stats.filtered, result.stats.initial);
        assert_eq!(result.stats.simplified, StageStats { nodes: 2, edges: 1 });
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let g = parallel();
        let requests = vec![
            ControlPathRequest::new(root(&g, "T"), Direction::Reverse),
            ControlPathRequest::new(root(&g, "T"), Direction::Forward),
            ControlPathRequest::new(root(&g, "S"), Direction::Forward),
        ];
        let results = engine_for(g).control_graphs(requests, 2).await;
        let empty: Vec<bool> = results.iter().map(|r| r.as_ref().unwrap().is_empty()).collect();
        assert_eq!(empty, vec![false, true, false]);
    }

    /// `layers` layers of `width` groups, every group a member of every
    /// group in the layer below, the bottom layer members of "R".
    fn layered(layers: usize, width: usize) -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_identity("R", "group");
        for layer in 1..=layers {
            for i in 0..width {
                let name = format!("L{layer}_{i}");
                g.add_identity(&name, "group");
                if layer == 1 {
                    g.add_relation(&name, "R", "GROUP_MEMBER");
                    continue;
                }
                for j in 0..width {
                    g.add_relation(&name, &format!("L{}_{j}", layer - 1), "GROUP_MEMBER");
                }
            }
        }
        g
    }

    #[tokio::test]
    async fn test_deadline_covers_deny_propagation() {
        let g = layered(14, 3);
        let request = ControlPathRequest::new(root(&g, "R"), Direction::Reverse);
        let cache = Arc::new(DenyCache::new(Arc::new(StaticDenySource(vec![DenyRecord::new(
            "L1_0",
            "R",
            "GROUP_MEMBER",
        )]))));
        let engine = engine_for(g)
            .with_deny_cache(cache)
            .with_timeout(Duration::from_millis(200));

        let start = Instant::now();
        let err = engine.control_graph(request).await.unwrap_err();
        assert!(matches!(err, ControlPathError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_deny_load_failure_aborts_request() {
        let g = parallel();
        let missing = tempfile::tempdir().unwrap();
        let cache = Arc::new(DenyCache::new(Arc::new(FileDenySource::new(missing.path()))));
        let request = ControlPathRequest::new(root(&g, "T"), Direction::Reverse);
        let err = engine_for(g).with_deny_cache(cache).control_graph(request).await.unwrap_err();
        assert!(matches!(err, ControlPathError::Deny(_)));
    }
}
