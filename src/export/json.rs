use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DepGraphError, Result};
use crate::graph::builder::assemble;
use crate::graph::model::DependencyGraph;
use crate::resolution::Resolution;
use crate::types::{Edge, Metadata, Node, NodeKind};

/// Canonical interchange document.
#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: String,
    kind: NodeKind,
    path: PathBuf,
    #[serde(default)]
    metadata: Metadata,
}

/// Renders `graph` as pretty-printed JSON with nodes sorted by id and edges
/// sorted by `(from, to, relation)`.
pub fn render_json(graph: &DependencyGraph) -> Result<String> {
    let mut nodes: Vec<NodeRecord> = graph
        .nodes()
        .iter()
        .map(|n| NodeRecord {
            id: n.id.clone(),
            kind: n.kind.clone(),
            path: n.absolute_path.clone(),
            metadata: n.metadata.clone(),
        })
        .collect();
    nodes.sort_unstable_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<Edge> = graph.edges().to_vec();
    edges.sort_unstable();

    Ok(serde_json::to_string_pretty(&GraphDocument { nodes, edges })?)
}

/// Reads a graph back from its JSON export.
///
/// Edges naming nodes absent from the document are dropped and recorded as
/// warnings, exactly as during a build.
pub fn parse_json(contents: &str) -> Result<DependencyGraph> {
    let document: GraphDocument =
        serde_json::from_str(contents).map_err(|e| DepGraphError::Parse {
            message: e.to_string(),
            format: "json".to_string(),
        })?;

    let resolution = Resolution {
        nodes: document
            .nodes
            .into_iter()
            .map(|n| Node {
                id: n.id,
                kind: n.kind,
                absolute_path: n.path,
                metadata: n.metadata,
            })
            .collect(),
        edges: document.edges.into_iter().collect(),
        warnings: Vec::new(),
    };
    Ok(assemble(resolution, None))
}
