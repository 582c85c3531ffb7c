use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::types::{BuildWarning, Cycle, Edge, GraphStats, Node, NodeKind, RelationKind};

/// Handle of a node inside one `DependencyGraph`.
pub type NodeHandle = usize;

/// Outcome of inserting an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Inserted,
    /// An identical `(from, to, relation)` edge already exists.
    Duplicate,
    /// One of the endpoints is not a node of this graph; nothing was stored.
    Dangling,
}

/// Outcome of inserting a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInsert {
    Inserted(NodeHandle),
    /// A node with this id existed; its metadata was replaced.
    Merged(NodeHandle),
    /// A node with this id existed with a different kind. The original kind
    /// was kept and only the metadata was replaced.
    KindConflict {
        handle: NodeHandle,
        kept: NodeKind,
        ignored: NodeKind,
    },
}

/// Directed dependency graph with insertion-ordered nodes.
///
/// Nodes live in a flat vector and are addressed by integer handles; edges are
/// stored once in insertion order and indexed by handle in both directions, so
/// forward and reverse lookups by id are a hash lookup plus a slice.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeHandle>,
    edges: Vec<Edge>,
    edge_keys: HashSet<(NodeHandle, NodeHandle, RelationKind)>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    warnings: Vec<BuildWarning>,
    signature: Option<String>,
    cycles: OnceLock<Vec<Cycle>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutation (builder side)
    // -----------------------------------------------------------------------

    /// Adds a node, or merges it into an existing node with the same id.
    ///
    /// A duplicate id overwrites the earlier metadata but never the id or kind.
    pub fn add_node(&mut self, node: Node) -> NodeInsert {
        self.cycles.take();
        if let Some(&handle) = self.index.get(&node.id) {
            let existing = &mut self.nodes[handle];
            existing.metadata = node.metadata;
            if existing.kind != node.kind {
                return NodeInsert::KindConflict {
                    handle,
                    kept: existing.kind.clone(),
                    ignored: node.kind,
                };
            }
            return NodeInsert::Merged(handle);
        }

        let handle = self.nodes.len();
        self.index.insert(node.id.clone(), handle);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        NodeInsert::Inserted(handle)
    }

    /// Adds an edge if both endpoints exist and it is not already present.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeInsert {
        let (Some(&from), Some(&to)) = (self.index.get(&edge.from), self.index.get(&edge.to))
        else {
            return EdgeInsert::Dangling;
        };
        if !self.edge_keys.insert((from, to, edge.relation.clone())) {
            return EdgeInsert::Duplicate;
        }

        self.cycles.take();
        let position = self.edges.len();
        self.edges.push(edge);
        self.outgoing[from].push(position);
        self.incoming[to].push(position);
        EdgeInsert::Inserted
    }

    pub fn push_warning(&mut self, warning: BuildWarning) {
        self.warnings.push(warning);
    }

    pub fn set_signature(&mut self, signature: impl Into<String>) {
        self.signature = Some(signature.into());
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Content signature of the snapshot this graph was built from, if any.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn handle(&self, id: &str) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.handle(id).map(|h| &self.nodes[h])
    }

    /// Edges leaving `id`, in insertion order. Empty for unknown ids.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_list(self.handle(id), &self.outgoing)
    }

    /// Edges arriving at `id`, in insertion order. Empty for unknown ids.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_list(self.handle(id), &self.incoming)
    }

    pub fn fan_out(&self, id: &str) -> usize {
        self.handle(id).map_or(0, |h| self.outgoing[h].len())
    }

    pub fn fan_in(&self, id: &str) -> usize {
        self.handle(id).map_or(0, |h| self.incoming[h].len())
    }

    /// Distinct successor ids of `id`, sorted.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self.outgoing(id).map(|e| e.to.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Distinct predecessor ids of `id`, sorted.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self.incoming(id).map(|e| e.from.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing(from).any(|e| e.to == to)
    }

    /// Returns aggregate statistics about the graph.
    pub fn stats(&self) -> GraphStats {
        let mut nodes_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            *nodes_by_kind.entry(node.kind.as_str().to_string()).or_default() += 1;
        }
        let mut edges_by_relation: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &self.edges {
            *edges_by_relation
                .entry(edge.relation.as_str().to_string())
                .or_default() += 1;
        }
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            warning_count: self.warnings.len(),
            nodes_by_kind,
            edges_by_relation,
        }
    }

    /// Memo slot for cycle detection; reset by every mutation.
    pub(crate) fn cycle_memo(&self) -> &OnceLock<Vec<Cycle>> {
        &self.cycles
    }

    fn edge_list<'a>(
        &'a self,
        handle: Option<NodeHandle>,
        lists: &'a [Vec<usize>],
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        handle
            .and_then(|h| lists.get(h))
            .into_iter()
            .flatten()
            .map(move |&position| &self.edges[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;

    fn node(id: &str) -> Node {
        Node::new(id, NodeKind::Module, format!("/repo/{id}.py"))
    }

    #[test]
    fn duplicate_node_keeps_kind_and_replaces_metadata() {
        let mut graph = DependencyGraph::new();
        graph.add_node(node("a").with_metadata("v", "1"));
        let outcome = graph.add_node(
            Node::new("a", NodeKind::File, "/elsewhere/a.py").with_metadata("v", "2"),
        );

        assert!(matches!(outcome, NodeInsert::KindConflict { .. }));
        let stored = graph.node("a").unwrap();
        assert_eq!(stored.kind, NodeKind::Module);
        assert_eq!(stored.absolute_path, std::path::PathBuf::from("/repo/a.py"));
        assert_eq!(stored.metadata.get("v"), Some(&MetadataValue::from("2")));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn edges_are_deduplicated_by_endpoints_and_relation() {
        let mut graph = DependencyGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));

        assert_eq!(
            graph.add_edge(Edge::new("a", "b", RelationKind::Imports)),
            EdgeInsert::Inserted
        );
        assert_eq!(
            graph.add_edge(Edge::new("a", "b", RelationKind::Imports)),
            EdgeInsert::Duplicate
        );
        assert_eq!(
            graph.add_edge(Edge::new("a", "b", RelationKind::References)),
            EdgeInsert::Inserted
        );
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.successors("a"), vec!["b"]);
        assert_eq!(graph.fan_in("b"), 2);
    }

    #[test]
    fn dangling_edges_are_not_stored() {
        let mut graph = DependencyGraph::new();
        graph.add_node(node("a"));

        assert_eq!(
            graph.add_edge(Edge::new("a", "ghost", RelationKind::Imports)),
            EdgeInsert::Dangling
        );
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.outgoing("a").count(), 0);
        assert_eq!(graph.incoming("ghost").count(), 0);
    }
}
