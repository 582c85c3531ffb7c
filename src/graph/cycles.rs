//! Circular dependency detection.
//!
//! Strongly connected components come from petgraph's Tarjan implementation
//! run over a mirror of the dependency graph whose nodes and edges are inserted
//! in lexical id order. Each non-trivial component is then reduced to one
//! representative simple cycle by a depth-first walk from its smallest id.

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::model::DependencyGraph;
use crate::types::Cycle;

/// Returns the circular dependencies of `graph`, sorted by starting node id.
///
/// The result is memoized on the graph itself: repeated calls against an
/// unchanged graph return the same slice without recomputation.
pub fn find_cycles(graph: &DependencyGraph) -> &[Cycle] {
    graph.cycle_memo().get_or_init(|| detect(graph))
}

/// Runs detection without consulting or filling the memo.
pub fn detect(graph: &DependencyGraph) -> Vec<Cycle> {
    let lexical = LexicalMirror::new(graph);

    let mut cycles: Vec<Cycle> = tarjan_scc(&lexical.graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&idx| lexical.graph.contains_edge(idx, idx))
        })
        .filter_map(|component| lexical.representative_cycle(&component))
        .collect();

    cycles.sort_unstable_by(|a, b| a.start().cmp(b.start()).then_with(|| a.cmp(b)));
    cycles
}

/// Copy of the dependency graph with petgraph indices assigned in lexical id
/// order, so `NodeIndex` order equals id order.
struct LexicalMirror<'a> {
    graph: DiGraph<&'a str, ()>,
    /// Sorted successor lists, indexed by `NodeIndex::index()`.
    successors: Vec<Vec<NodeIndex>>,
}

impl<'a> LexicalMirror<'a> {
    fn new(source: &'a DependencyGraph) -> Self {
        let mut ids: Vec<&'a str> = source.nodes().iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();

        let mut graph: DiGraph<&'a str, ()> =
            DiGraph::with_capacity(ids.len(), source.edge_count());
        for id in &ids {
            graph.add_node(*id);
        }

        let position = |id: &str| ids.binary_search(&id).ok().map(NodeIndex::new);

        let mut successors: Vec<Vec<NodeIndex>> = Vec::with_capacity(ids.len());
        for id in &ids {
            // Parallel edges of different relations collapse into one here.
            let targets: Vec<NodeIndex> = source
                .successors(id)
                .into_iter()
                .filter_map(|to| position(to))
                .collect();
            successors.push(targets);
        }
        for (from, targets) in successors.iter().enumerate() {
            for &to in targets {
                graph.add_edge(NodeIndex::new(from), to, ());
            }
        }

        Self { graph, successors }
    }

    fn id(&self, idx: NodeIndex) -> String {
        self.graph
            .node_weight(idx)
            .map(|id| (*id).to_string())
            .unwrap_or_default()
    }

    /// Walks depth-first from the component's smallest node, visiting
    /// successors in lexical order and staying inside the component, until an
    /// edge closes back onto the start. The DFS stack at that moment is a
    /// simple cycle.
    fn representative_cycle(&self, component: &[NodeIndex]) -> Option<Cycle> {
        let start = *component.iter().min()?;
        let members: HashSet<NodeIndex> = component.iter().copied().collect();

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut path: Vec<NodeIndex> = vec![start];
        let mut cursors: Vec<usize> = vec![0];

        loop {
            let Some(&current) = path.last() else { break };
            let Some(cursor) = cursors.last_mut() else { break };
            let next = self
                .successors
                .get(current.index())
                .and_then(|targets| targets.get(*cursor))
                .copied();
            *cursor += 1;

            match next {
                Some(target) if target == start => {
                    return Some(Cycle {
                        nodes: path.iter().map(|&idx| self.id(idx)).collect(),
                    });
                }
                Some(target) if members.contains(&target) && visited.insert(target) => {
                    path.push(target);
                    cursors.push(0);
                }
                Some(_) => {}
                None => {
                    path.pop();
                    cursors.pop();
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node, NodeKind, RelationKind};

    fn graph_of(ids: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in ids {
            graph.add_node(Node::new(*id, NodeKind::Module, format!("/r/{id}")));
        }
        for (from, to) in edges {
            graph.add_edge(Edge::new(*from, *to, RelationKind::Imports));
        }
        graph
    }

    #[test]
    fn representative_cycle_prefers_lexical_successors() {
        // Two cycles through `a`: a->b->a and a->c->a. The walk takes `b` first.
        let graph = graph_of(&["a", "b", "c"], &[("a", "c"), ("c", "a"), ("a", "b"), ("b", "a")]);
        let cycles = detect(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["a", "b"]);
    }

    #[test]
    fn walk_stays_inside_component() {
        // {a, c} and {b, d} are separate components even though a -> b.
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("d", "b"), ("c", "a")],
        );
        let cycles = detect(&graph);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].nodes, vec!["a", "c"]);
        assert_eq!(cycles[1].nodes, vec!["b", "d"]);
    }

    #[test]
    fn memo_is_reset_by_mutation() {
        let mut graph = graph_of(&["a", "b"], &[("a", "b")]);
        assert!(find_cycles(&graph).is_empty());

        graph.add_edge(Edge::new("b", "a", RelationKind::Imports));
        assert_eq!(find_cycles(&graph).len(), 1);
    }
}
