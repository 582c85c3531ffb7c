use std::collections::HashSet;

use tracing::debug;

use crate::errors::{DepGraphError, Result};
use crate::graph::model::DependencyGraph;
use crate::types::{NodeKind, TraversalBounds};

/// One node reached by a dependency query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reached {
    pub id: String,
    /// Number of edges between the query node and this node (1 = direct).
    pub distance: usize,
    /// Computed at query time; never stored on the graph.
    pub is_indirect: bool,
}

/// Direction a dependency query follows edges in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDirection {
    /// What the node depends on (outgoing edges).
    Dependencies,
    /// What depends on the node (incoming edges).
    Dependents,
}

/// Read-only query operations against one graph snapshot.
pub struct GraphQuery<'a> {
    graph: &'a DependencyGraph,
    bounds: TraversalBounds,
}

impl<'a> GraphQuery<'a> {
    /// Creates a query handle using the default traversal bounds.
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self {
            graph,
            bounds: TraversalBounds::default(),
        }
    }

    pub fn with_bounds(graph: &'a DependencyGraph, bounds: TraversalBounds) -> Self {
        Self { graph, bounds }
    }

    /// Returns the ids `id` depends on.
    ///
    /// Direct mode returns the immediate successors sorted by id. Indirect mode
    /// returns everything reachable from `id` (excluding `id` itself), ordered
    /// by distance and then id.
    pub fn get_dependencies(&self, id: &str, include_indirect: bool) -> Result<Vec<String>> {
        Ok(self
            .reachable(id, QueryDirection::Dependencies, include_indirect)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Returns the ids that depend on `id`, with the same ordering rules as
    /// [`GraphQuery::get_dependencies`].
    pub fn get_dependents(&self, id: &str, include_indirect: bool) -> Result<Vec<String>> {
        Ok(self
            .reachable(id, QueryDirection::Dependents, include_indirect)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Returns the ids of all nodes of the given kind, sorted.
    pub fn get_by_kind(&self, kind: &NodeKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| &n.kind == kind)
            .map(|n| n.id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Breadth-first traversal from `id`, one layer at a time.
    ///
    /// Each layer is sorted by id before the next one is expanded, so the
    /// result order is (distance, id). The walk stops early once the traversal
    /// bounds are hit.
    pub fn reachable(
        &self,
        id: &str,
        direction: QueryDirection,
        include_indirect: bool,
    ) -> Result<Vec<Reached>> {
        if !self.graph.contains(id) {
            return Err(DepGraphError::UnknownNode { id: id.to_string() });
        }

        let max_depth = if include_indirect {
            self.bounds.max_depth
        } else {
            1
        };

        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut result: Vec<Reached> = Vec::new();
        let mut frontier: Vec<&str> = vec![id];
        let mut depth = 0;

        while !frontier.is_empty() && depth < max_depth {
            depth += 1;
            let mut layer: Vec<&str> = Vec::new();
            for current in &frontier {
                for neighbor in self.neighbors(current, direction) {
                    if visited.insert(neighbor) {
                        layer.push(neighbor);
                    }
                }
            }
            layer.sort_unstable();

            for neighbor in &layer {
                if include_indirect && result.len() >= self.bounds.max_nodes {
                    debug!(
                        node = id,
                        limit = self.bounds.max_nodes,
                        "dependency traversal truncated at node limit"
                    );
                    return Ok(result);
                }
                result.push(Reached {
                    id: (*neighbor).to_string(),
                    distance: depth,
                    is_indirect: depth > 1,
                });
            }
            frontier = layer;
        }

        if include_indirect && depth >= max_depth && !frontier.is_empty() {
            debug!(
                node = id,
                limit = max_depth,
                "dependency traversal truncated at depth limit"
            );
        }

        Ok(result)
    }

    fn neighbors(&self, id: &str, direction: QueryDirection) -> Vec<&'a str> {
        match direction {
            QueryDirection::Dependencies => self.graph.successors(id),
            QueryDirection::Dependents => self.graph.predecessors(id),
        }
    }
}
