//! Root resolution: turn a user-supplied term into exactly one identity.

use adcp_core::{aliases, Identity, NodeKey};
use adcp_graph::{NeighborSource, SearchMode};

use crate::error::{ControlPathError, Result};

/// Resolve `term` to a root principal.
///
/// An integer is a store key. Otherwise the term is looked up in the alias
/// table for `lang` and searched as a pattern, or searched as a name prefix.
/// Several matches are reported as `AmbiguousRoot`; choosing among them is
/// left to the caller.
pub async fn resolve_root(source: &dyn NeighborSource, term: &str, lang: &str) -> Result<Identity> {
    if let Ok(key) = term.parse::<i64>() {
        return source
            .identity(NodeKey(key))
            .await?
            .ok_or_else(|| ControlPathError::RootNotFound { term: term.to_string() });
    }

    let mut candidates = match aliases::lookup(lang, term) {
        Some(pattern) => {
            tracing::debug!(alias = term, pattern, "Alias resolved");
            source.search(pattern, SearchMode::Pattern).await?
        }
        None => source.search(term, SearchMode::StartsWith).await?,
    };

    match candidates.len() {
        0 => Err(ControlPathError::RootNotFound { term: term.to_string() }),
        1 => Ok(candidates.remove(0)),
        n => {
            tracing::debug!(term, matches = n, "Ambiguous root");
            Err(ControlPathError::AmbiguousRoot {
                term: term.to_string(),
                candidates,
            })
        }
    }
}
