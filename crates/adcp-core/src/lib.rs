//! adcp-core: Shared types, alias tables, configuration, and error handling
//! for Active Directory control-path analysis.
//!
//! This crate provides the foundational types used across all adcp crates:
//! - Identities (users, groups, computers) and their store keys
//! - Relation kinds and the typed relation-kind sets built from them
//! - Denial records loaded from ACL dumps
//! - Localized alias tables for well-known principals
//! - Configuration management

pub mod aliases;
pub mod config;
pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{DenyRecord, Direction, Identity, NodeKey, RelationKind, RelationKinds};
