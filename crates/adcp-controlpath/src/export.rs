//! JSON export of a control graph.
//!
//! ```json
//! {"nodes": [{"id": 12, "name": "cn=a,dc=x", "shortname": "cn=a", "type": "user"}],
//!  "links": [{"source": 0, "target": 1, "rels": ["GROUP_MEMBER"]}]}
//! ```
//!
//! `source` and `target` are positions in `nodes`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use adcp_core::{NodeKey, RelationKinds};

use crate::error::Result;
use crate::graph::PathGraph;

/// Label given to links carrying a denied relation when denials are shown.
pub const DENY_MARKER: &str = "DENY";

const UNKNOWN_TYPE: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportNode {
    pub id: NodeKey,
    pub name: String,
    pub shortname: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportLink {
    pub source: usize,
    pub target: usize,
    pub rels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportGraph {
    pub nodes: Vec<ExportNode>,
    pub links: Vec<ExportLink>,
}

impl ExportGraph {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Export toggles, parsed from `+name,-name` lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Keep NoLinks nodes and denied relations, marking the latter.
    pub show_denied: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { show_denied: true }
    }
}

impl ExportOptions {
    /// Parse a comma-separated toggle list on top of the defaults. Returns
    /// the options and the entries that could not be understood.
    pub fn parse(list: &str) -> (Self, Vec<String>) {
        let mut options = Self::default();
        let mut invalid = Vec::new();

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (enabled, name) = if let Some(name) = entry.strip_prefix('+') {
                (true, name)
            } else if let Some(name) = entry.strip_prefix('-') {
                (false, name)
            } else {
                invalid.push(entry.to_string());
                continue;
            };
            match name {
                "deny" => options.show_denied = enabled,
                _ => invalid.push(entry.to_string()),
            }
        }

        (options, invalid)
    }
}

/// Convert a control graph to the export format.
pub fn export(graph: &PathGraph, options: &ExportOptions) -> ExportGraph {
    let mut out = ExportGraph::default();
    let mut positions: HashMap<NodeKey, usize> = HashMap::new();

    for node in graph.nodes() {
        if !options.show_denied && graph.is_no_links(node.key) {
            continue;
        }
        positions.insert(node.key, out.nodes.len());
        out.nodes.push(ExportNode {
            id: node.key,
            name: node.name.clone(),
            shortname: node.short_name().to_string(),
            kind: node.kind().unwrap_or(UNKNOWN_TYPE).to_string(),
        });
    }

    for edge in graph.edges() {
        let (Some(&source), Some(&target)) = (positions.get(&edge.source), positions.get(&edge.target)) else {
            continue;
        };

        let mut rels: Vec<String> = if options.show_denied {
            edge.kinds.iter().map(|k| k.as_str().to_string()).collect()
        } else {
            reconcile(&edge.kinds)
                .iter()
                .map(|k| k.as_str().to_string())
                .collect()
        };
        if rels.is_empty() {
            continue;
        }
        if options.show_denied && edge.denied {
            rels.push(DENY_MARKER.to_string());
        }

        out.links.push(ExportLink { source, target, rels });
    }

    out
}

/// Remove each `DENY_<kind>` tag together with `<kind>`, when present.
fn reconcile(kinds: &RelationKinds) -> RelationKinds {
    let mut kept = kinds.clone();
    for tag in kinds {
        if let Some(base) = tag.denied_kind() {
            kept.remove(tag);
            kept.remove(&base);
        }
    }
    kept
}
