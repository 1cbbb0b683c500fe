//! Conversion of exported control graphs to graph-tool formats.
//!
//! GEXF and GraphML are serialized with `quick-xml`; GML is plain text.
//! Nodes are identified by their position in the export. Every node carries
//! `id`, `name`, `shortname` and `type`; every edge carries `relations`,
//! the comma-joined relation list.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ControlPathError, Result};
use crate::export::{ExportGraph, ExportNode};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Gexf,
    Gml,
    GraphMl,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Gexf, Self::Gml, Self::GraphMl];

    /// Format name, also used as the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gexf => "gexf",
            Self::Gml => "gml",
            Self::GraphMl => "graphml",
        }
    }

    pub fn render(&self, graph: &ExportGraph) -> Result<String> {
        match self {
            Self::Gexf => to_gexf(graph),
            Self::Gml => to_gml(graph).map_err(|e| ControlPathError::Convert(e.to_string())),
            Self::GraphMl => to_graphml(graph),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ControlPathError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControlPathError::Convert(format!("invalid format {s}")))
    }
}

/// Convert the export at `infile` to `format`, writing
/// `<outdir>/<infile stem>.<format>`. Returns the written path.
pub fn convert_file(infile: &Path, outdir: &Path, format: OutputFormat) -> Result<PathBuf> {
    let graph = ExportGraph::from_json_file(infile)?;
    let stem = infile
        .file_stem()
        .ok_or_else(|| ControlPathError::Convert(format!("no file name in {}", infile.display())))?;

    std::fs::create_dir_all(outdir)?;
    let outfile = outdir.join(format!("{}.{}", stem.to_string_lossy(), format.as_str()));
    std::fs::write(&outfile, format.render(&graph)?)?;

    tracing::info!(
        format = %format,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        outfile = %outfile.display(),
        "Graph converted"
    );
    Ok(outfile)
}

fn relations(rels: &[String]) -> String {
    rels.join(",")
}

fn serialize_xml<T: Serialize>(document: &T) -> Result<String> {
    let mut xml = String::from(XML_DECL);
    let mut serializer = quick_xml::se::Serializer::new(&mut xml);
    serializer.indent(' ', 2);
    document
        .serialize(serializer)
        .map_err(|e| ControlPathError::Convert(format!("XML serialization failed: {e}")))?;
    xml.push('\n');
    Ok(xml)
}

// ── GraphML ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename = "graphml")]
struct GraphMl {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    key: Vec<GraphMlKey>,
    graph: GraphMlGraph,
}

#[derive(Serialize)]
struct GraphMlKey {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@for")]
    domain: &'static str,
    #[serde(rename = "@attr.name")]
    name: &'static str,
    #[serde(rename = "@attr.type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct GraphMlGraph {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@edgedefault")]
    edge_default: &'static str,
    node: Vec<GraphMlNode>,
    edge: Vec<GraphMlEdge>,
}

#[derive(Serialize)]
struct GraphMlNode {
    #[serde(rename = "@id")]
    id: usize,
    data: Vec<GraphMlData>,
}

#[derive(Serialize)]
struct GraphMlEdge {
    #[serde(rename = "@source")]
    source: usize,
    #[serde(rename = "@target")]
    target: usize,
    data: Vec<GraphMlData>,
}

#[derive(Serialize)]
struct GraphMlData {
    #[serde(rename = "@key")]
    key: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

const GRAPHML_KEYS: [GraphMlKey; 5] = [
    GraphMlKey { id: "id", domain: "node", name: "id", kind: "long" },
    GraphMlKey { id: "name", domain: "node", name: "name", kind: "string" },
    GraphMlKey { id: "shortname", domain: "node", name: "shortname", kind: "string" },
    GraphMlKey { id: "type", domain: "node", name: "type", kind: "string" },
    GraphMlKey { id: "relations", domain: "edge", name: "relations", kind: "string" },
];

fn node_data(node: &ExportNode) -> Vec<GraphMlData> {
    [
        ("id", node.id.to_string()),
        ("name", node.name.clone()),
        ("shortname", node.shortname.clone()),
        ("type", node.kind.clone()),
    ]
    .into_iter()
    .map(|(key, value)| GraphMlData { key, value })
    .collect()
}

fn to_graphml(graph: &ExportGraph) -> Result<String> {
    let document = GraphMl {
        xmlns: "http://graphml.graphdrawing.org/xmlns",
        key: GRAPHML_KEYS.into_iter().collect(),
        graph: GraphMlGraph {
            id: "G",
            edge_default: "directed",
            node: graph
                .nodes
                .iter()
                .enumerate()
                .map(|(id, node)| GraphMlNode {
                    id,
                    data: node_data(node),
                })
                .collect(),
            edge: graph
                .links
                .iter()
                .map(|link| GraphMlEdge {
                    source: link.source,
                    target: link.target,
                    data: vec![GraphMlData {
                        key: "relations",
                        value: relations(&link.rels),
                    }],
                })
                .collect(),
        },
    };
    serialize_xml(&document)
}

// ── GEXF ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename = "gexf")]
struct Gexf {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@version")]
    version: &'static str,
    graph: GexfGraph,
}

#[derive(Serialize)]
struct GexfGraph {
    #[serde(rename = "@defaultedgetype")]
    default_edge_type: &'static str,
    #[serde(rename = "@mode")]
    mode: &'static str,
    attributes: Vec<GexfAttributes>,
    nodes: GexfNodes,
    edges: GexfEdges,
}

#[derive(Serialize)]
struct GexfAttributes {
    #[serde(rename = "@class")]
    class: &'static str,
    attribute: Vec<GexfAttribute>,
}

#[derive(Serialize)]
struct GexfAttribute {
    #[serde(rename = "@id")]
    id: usize,
    #[serde(rename = "@title")]
    title: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct GexfNodes {
    node: Vec<GexfNode>,
}

#[derive(Serialize)]
struct GexfNode {
    #[serde(rename = "@id")]
    id: usize,
    #[serde(rename = "@label")]
    label: String,
    attvalues: GexfAttValues,
}

#[derive(Serialize)]
struct GexfEdges {
    edge: Vec<GexfEdge>,
}

#[derive(Serialize)]
struct GexfEdge {
    #[serde(rename = "@id")]
    id: usize,
    #[serde(rename = "@source")]
    source: usize,
    #[serde(rename = "@target")]
    target: usize,
    attvalues: GexfAttValues,
}

#[derive(Serialize)]
struct GexfAttValues {
    attvalue: Vec<GexfAttValue>,
}

#[derive(Serialize)]
struct GexfAttValue {
    #[serde(rename = "@for")]
    attribute: usize,
    #[serde(rename = "@value")]
    value: String,
}

const GEXF_NODE_ATTRIBUTES: [(&str, &str); 4] = [("id", "long"), ("name", "string"), ("shortname", "string"), ("type", "string")];

fn to_gexf(graph: &ExportGraph) -> Result<String> {
    let node_attributes = GEXF_NODE_ATTRIBUTES
        .iter()
        .enumerate()
        .map(|(id, &(title, kind))| GexfAttribute { id, title, kind })
        .collect();

    let nodes = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(id, node)| GexfNode {
            id,
            label: node.shortname.clone(),
            attvalues: GexfAttValues {
                attvalue: [node.id.to_string(), node.name.clone(), node.shortname.clone(), node.kind.clone()]
                    .into_iter()
                    .enumerate()
                    .map(|(attribute, value)| GexfAttValue { attribute, value })
                    .collect(),
            },
        })
        .collect();

    let edges = graph
        .links
        .iter()
        .enumerate()
        .map(|(id, link)| GexfEdge {
            id,
            source: link.source,
            target: link.target,
            attvalues: GexfAttValues {
                attvalue: vec![GexfAttValue {
                    attribute: 0,
                    value: relations(&link.rels),
                }],
            },
        })
        .collect();

    let document = Gexf {
        xmlns: "http://www.gexf.net/1.2draft",
        version: "1.2",
        graph: GexfGraph {
            default_edge_type: "directed",
            mode: "static",
            attributes: vec![
                GexfAttributes {
                    class: "node",
                    attribute: node_attributes,
                },
                GexfAttributes {
                    class: "edge",
                    attribute: vec![GexfAttribute {
                        id: 0,
                        title: "relations",
                        kind: "string",
                    }],
                },
            ],
            nodes: GexfNodes { node: nodes },
            edges: GexfEdges { edge: edges },
        },
    };
    serialize_xml(&document)
}

// ── GML ───────────────────────────────────────────────────────────

fn gml_string(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

fn to_gml(graph: &ExportGraph) -> std::result::Result<String, fmt::Error> {
    let mut out = String::from("graph [\n  directed 1\n");
    for (i, node) in graph.nodes.iter().enumerate() {
        write!(
            out,
            "  node [\n    id {i}\n    label \"{i}\"\n    key {}\n    name \"{}\"\n    shortname \"{}\"\n    type \"{}\"\n  ]\n",
            node.id,
            gml_string(&node.name),
            gml_string(&node.shortname),
            gml_string(&node.kind),
        )?;
    }
    for link in &graph.links {
        write!(
            out,
            "  edge [\n    source {}\n    target {}\n    relations \"{}\"\n  ]\n",
            link.source,
            link.target,
            gml_string(&relations(&link.rels)),
        )?;
    }
    out.push_str("]\n");
    Ok(out)
}
