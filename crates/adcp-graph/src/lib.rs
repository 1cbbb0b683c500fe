//! adcp-graph: graph-query collaborators for control-path analysis.
//!
//! The control-path engine only ever talks to a [`NeighborSource`]: a store
//! able to answer one-hop neighbor queries and name lookups. This crate
//! provides the Neo4j-backed [`GraphClient`], the in-memory [`MemoryGraph`]
//! used by tests and offline runs, and TSV fixture loading for both.

pub mod client;
pub mod fixture;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod source;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use fixture::Fixture;
pub use memory::MemoryGraph;
pub use source::{NeighborRecord, NeighborSource, SearchMode};
