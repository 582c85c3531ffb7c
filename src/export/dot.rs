use std::fmt::Write;

use crate::graph::model::DependencyGraph;
use crate::types::Edge;

/// Renders `graph` as a Graphviz `digraph`.
///
/// Node declarations come first, sorted by id, followed by the edges in
/// canonical order. Every edge is labelled with its relation.
pub fn render_dot(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph dependencies {{");
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [shape=box];");

    let mut nodes: Vec<_> = graph.nodes().iter().collect();
    nodes.sort_unstable_by(|a, b| a.id.cmp(&b.id));
    for node in nodes {
        let _ = writeln!(
            out,
            "    \"{}\" [kind=\"{}\"];",
            escape(&node.id),
            escape(node.kind.as_str())
        );
    }

    let mut edges: Vec<&Edge> = graph.edges().iter().collect();
    edges.sort_unstable();
    for edge in edges {
        let _ = writeln!(
            out,
            "    \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(&edge.from),
            escape(&edge.to),
            escape(edge.relation.as_str())
        );
    }

    out.push_str("}\n");
    out
}

/// Escapes a value for use inside a double-quoted DOT id.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_and_backslashes() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape("plain.id"), "plain.id");
        assert_eq!(escape("two\nlines"), "two\\nlines");
    }
}
