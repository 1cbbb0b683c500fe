//! Request and response types for control-path computations.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use adcp_core::{Direction, Identity};

use crate::deny::DenySummary;
use crate::error::{ControlPathError, Result};
use crate::graph::PathGraph;

/// Request to compute the control graph of one root principal.
#[derive(Debug, Clone)]
pub struct ControlPathRequest {
    /// The resolved root. Resolution (and disambiguation) happens upstream.
    pub root: Identity,
    pub direction: Direction,
    /// Maximum expansion rounds (default: engine setting).
    pub max_depth: Option<usize>,
    /// Per-request deadline in seconds (default: engine setting).
    pub timeout_secs: Option<u64>,
}

impl ControlPathRequest {
    pub fn new(root: Identity, direction: Direction) -> Self {
        Self {
            root,
            direction,
            max_depth: None,
            timeout_secs: None,
        }
    }
}

/// Point in time after which a request is abandoned.
///
/// Synchronous stages poll it; the async stages are bounded by
/// `tokio::time::timeout` on the same limit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// `Err(Timeout)` once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(ControlPathError::Timeout {
                max_seconds: self.limit.as_secs(),
            });
        }
        Ok(())
    }
}

/// Node and edge counts of a graph at one stage.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StageStats {
    pub nodes: usize,
    pub edges: usize,
}

impl StageStats {
    pub fn of(graph: &PathGraph) -> Self {
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        }
    }
}

/// Graph size after each stage of the pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct GraphStats {
    pub initial: StageStats,
    pub filtered: StageStats,
    pub simplified: StageStats,
}

/// Complete result of a control-path computation.
#[derive(Debug, Clone, Serialize)]
pub struct ControlPathResult {
    pub request_id: Uuid,
    pub root: Identity,
    pub direction: Direction,
    /// `None` when the root has no relation in `direction`.
    pub graph: Option<PathGraph>,
    pub stats: GraphStats,
    pub deny: DenySummary,
    pub computation_ms: u64,
    pub computed_at: DateTime<Utc>,
}

impl ControlPathResult {
    pub fn is_empty(&self) -> bool {
        self.graph.is_none()
    }
}
