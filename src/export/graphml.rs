use std::fmt::Write;

use crate::graph::model::DependencyGraph;
use crate::types::Edge;

/// Renders `graph` as a GraphML document.
///
/// `kind` and `path` are declared as node keys and `relation` as an edge key.
pub fn render_graphml(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    out.push_str("  <key id=\"kind\" for=\"node\" attr.name=\"kind\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"path\" for=\"node\" attr.name=\"path\" attr.type=\"string\"/>\n");
    out.push_str(
        "  <key id=\"relation\" for=\"edge\" attr.name=\"relation\" attr.type=\"string\"/>\n",
    );
    out.push_str("  <graph id=\"dependencies\" edgedefault=\"directed\">\n");

    let mut nodes: Vec<_> = graph.nodes().iter().collect();
    nodes.sort_unstable_by(|a, b| a.id.cmp(&b.id));
    for node in nodes {
        let _ = writeln!(out, "    <node id=\"{}\">", escape_xml(&node.id));
        let _ = writeln!(
            out,
            "      <data key=\"kind\">{}</data>",
            escape_xml(node.kind.as_str())
        );
        let _ = writeln!(
            out,
            "      <data key=\"path\">{}</data>",
            escape_xml(&node.absolute_path.to_string_lossy())
        );
        out.push_str("    </node>\n");
    }

    let mut edges: Vec<&Edge> = graph.edges().iter().collect();
    edges.sort_unstable();
    for (i, edge) in edges.into_iter().enumerate() {
        let _ = writeln!(
            out,
            "    <edge id=\"e{}\" source=\"{}\" target=\"{}\">",
            i,
            escape_xml(&edge.from),
            escape_xml(&edge.to)
        );
        let _ = writeln!(
            out,
            "      <data key=\"relation\">{}</data>",
            escape_xml(edge.relation.as_str())
        );
        out.push_str("    </edge>\n");
    }

    out.push_str("  </graph>\n");
    out.push_str("</graphml>\n");
    out
}

/// Escapes the five XML special characters. Characters XML 1.0 cannot carry
/// at all become U+FFFD.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => {
                escaped.push(char::REPLACEMENT_CHARACTER)
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(
            escape_xml(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_xml_replaces_illegal_control_characters() {
        assert_eq!(escape_xml("a\u{0}b\u{1b}c"), "a\u{fffd}b\u{fffd}c");
        assert_eq!(escape_xml("tab\tline\ncr\r"), "tab\tline\ncr\r");
    }
}
