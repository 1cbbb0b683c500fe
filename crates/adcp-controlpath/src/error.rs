//! Error types for the adcp-controlpath crate.

use std::path::PathBuf;

use thiserror::Error;

use adcp_core::Identity;

#[derive(Error, Debug)]
pub enum ControlPathError {
    #[error("Graph error: {0}")]
    Graph(#[from] adcp_graph::GraphError),

    #[error("Deny ACE error: {0}")]
    Deny(#[from] DenyError),

    #[error("Node not found: {term}")]
    RootNotFound { term: String },

    #[error("Ambiguous root: {term} matches {} principals", candidates.len())]
    AmbiguousRoot {
        term: String,
        candidates: Vec<Identity>,
    },

    #[error("Computation timeout: exceeded {max_seconds}s limit")]
    Timeout { max_seconds: u64 },

    #[error("Conversion error: {0}")]
    Convert(String),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while loading denial records. Any of these aborts the request:
/// silently skipping a deny file would overstate control.
#[derive(Error, Debug)]
pub enum DenyError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed deny file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Deny file {path} is not valid UTF-16LE")]
    Encoding { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ControlPathError>;
