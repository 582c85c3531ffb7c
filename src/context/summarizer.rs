use std::fmt::Write;

use crate::graph::cycles::find_cycles;
use crate::graph::model::DependencyGraph;
use crate::types::ContextFormat;

/// Fixed characters-per-token ratio used for budgeting.
pub const CHARS_PER_TOKEN: usize = 4;

/// Hubs listed when no explicit limit is configured.
pub const DEFAULT_HUB_LIMIT: usize = 5;

/// Estimated token count of `text`, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub max_tokens: usize,
    pub format: ContextFormat,
    pub hub_limit: usize,
}

impl ContextOptions {
    pub fn new(max_tokens: usize, format: ContextFormat) -> Self {
        Self {
            max_tokens,
            format,
            hub_limit: DEFAULT_HUB_LIMIT,
        }
    }
}

/// Summarizes `graph` in at most `max_tokens` estimated tokens.
pub fn generate_context(graph: &DependencyGraph, max_tokens: usize, format: ContextFormat) -> String {
    generate_context_with(graph, &ContextOptions::new(max_tokens, format))
}

/// Summarizes `graph` with explicit options.
///
/// Content is produced as an ordered list of blocks: counts, then cycles,
/// then hubs, then one dependency line per node. Blocks are appended until
/// the first one that would exceed the budget; nothing after it is emitted,
/// so the output for a smaller budget is always a prefix of the output for a
/// larger one.
pub fn generate_context_with(graph: &DependencyGraph, options: &ContextOptions) -> String {
    let max_chars = options.max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let markup = Markup::new(options.format);

    let mut out = String::new();
    let mut used = 0usize;
    for block in blocks(graph, options, &markup) {
        let len = block.chars().count();
        if used + len > max_chars {
            break;
        }
        used += len;
        out.push_str(&block);
    }
    out
}

/// Heading and list-item markup for one output format.
struct Markup {
    format: ContextFormat,
}

impl Markup {
    fn new(format: ContextFormat) -> Self {
        Self { format }
    }

    fn title(&self, text: &str) -> String {
        match self.format {
            ContextFormat::Markdown => format!("# {text}\n\n"),
            ContextFormat::Text => format!("{}\n\n", text.to_uppercase()),
        }
    }

    fn heading(&self, text: &str) -> String {
        match self.format {
            ContextFormat::Markdown => format!("\n## {text}\n\n"),
            ContextFormat::Text => format!("\n{}\n", text.to_uppercase()),
        }
    }

    fn field(&self, name: &str, value: &str) -> String {
        match self.format {
            ContextFormat::Markdown => format!("- **{name}:** {value}\n"),
            ContextFormat::Text => format!("{name}: {value}\n"),
        }
    }

    fn code(&self, text: &str) -> String {
        match self.format {
            ContextFormat::Markdown => format!("`{text}`"),
            ContextFormat::Text => text.to_string(),
        }
    }

    fn item(&self, text: &str) -> String {
        format!("- {text}\n")
    }
}

fn blocks(graph: &DependencyGraph, options: &ContextOptions, markup: &Markup) -> Vec<String> {
    let mut blocks = vec![summary_block(graph, markup)];
    push_section(&mut blocks, markup, "Circular dependencies", cycle_items(graph, markup));
    push_section(&mut blocks, markup, "Hubs", hub_items(graph, options.hub_limit, markup));
    push_section(&mut blocks, markup, "Dependencies", dependency_items(graph, markup));
    blocks
}

/// Adds a section; the heading travels with its first item so a heading is
/// never emitted on its own.
fn push_section(blocks: &mut Vec<String>, markup: &Markup, heading: &str, items: Vec<String>) {
    let mut items = items.into_iter();
    let Some(first) = items.next() else {
        return;
    };
    blocks.push(format!("{}{}", markup.heading(heading), first));
    blocks.extend(items);
}

fn summary_block(graph: &DependencyGraph, markup: &Markup) -> String {
    let stats = graph.stats();
    let cycles = find_cycles(graph).len();

    let mut block = markup.title("Dependency summary");
    block.push_str(&markup.field("Nodes", &stats.node_count.to_string()));
    block.push_str(&markup.field("Edges", &stats.edge_count.to_string()));
    block.push_str(&markup.field("Cycles", &cycles.to_string()));
    if !stats.nodes_by_kind.is_empty() {
        let kinds: Vec<String> = stats
            .nodes_by_kind
            .iter()
            .map(|(kind, count)| format!("{kind} ({count})"))
            .collect();
        block.push_str(&markup.field("Node kinds", &kinds.join(", ")));
    }
    block
}

fn cycle_items(graph: &DependencyGraph, markup: &Markup) -> Vec<String> {
    find_cycles(graph)
        .iter()
        .map(|cycle| markup.item(&markup.code(&cycle.render())))
        .collect()
}

fn hub_items(graph: &DependencyGraph, limit: usize, markup: &Markup) -> Vec<String> {
    let mut hubs: Vec<(&str, usize, usize)> = graph
        .nodes()
        .iter()
        .map(|n| (n.id.as_str(), graph.fan_in(&n.id), graph.fan_out(&n.id)))
        .filter(|(_, fan_in, fan_out)| fan_in + fan_out > 0)
        .collect();
    hubs.sort_unstable_by(|a, b| (b.1 + b.2).cmp(&(a.1 + a.2)).then_with(|| a.0.cmp(b.0)));
    hubs.truncate(limit);

    hubs.into_iter()
        .map(|(id, fan_in, fan_out)| {
            markup.item(&format!(
                "{} (fan-in {fan_in}, fan-out {fan_out})",
                markup.code(id)
            ))
        })
        .collect()
}

fn dependency_items(graph: &DependencyGraph, markup: &Markup) -> Vec<String> {
    let mut nodes: Vec<_> = graph.nodes().iter().collect();
    nodes.sort_unstable_by(|a, b| a.id.cmp(&b.id));

    nodes
        .into_iter()
        .map(|node| {
            let mut line = format!("{} ({})", markup.code(&node.id), node.kind);
            let successors = graph.successors(&node.id);
            if successors.is_empty() {
                line.push_str(": no dependencies");
            } else {
                let _ = write!(line, " -> {}", successors.join(", "));
            }
            markup.item(&line)
        })
        .collect()
}
