use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DepGraphError;

/// Kinds of nodes in the dependency graph.
///
/// Each resolver uses the subset that fits its language; kinds that no
/// resolver knows about (for example ones read back from a JSON export made by
/// a newer build) are carried verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum NodeKind {
    Module,
    File,
    Resource,
    Data,
    Variable,
    Output,
    ModuleCall,
    Local,
    Provider,
    Custom(String),
}

#[allow(clippy::should_implement_trait)]
impl NodeKind {
    /// Returns the string representation of this node kind.
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Module => "module",
            NodeKind::File => "file",
            NodeKind::Resource => "resource",
            NodeKind::Data => "data",
            NodeKind::Variable => "variable",
            NodeKind::Output => "output",
            NodeKind::ModuleCall => "module_call",
            NodeKind::Local => "local",
            NodeKind::Provider => "provider",
            NodeKind::Custom(name) => name,
        }
    }

    /// Parses a string into a `NodeKind`. Unrecognized names become `Custom`.
    pub fn from_str(s: &str) -> NodeKind {
        match s {
            "module" => NodeKind::Module,
            "file" => NodeKind::File,
            "resource" => NodeKind::Resource,
            "data" => NodeKind::Data,
            "variable" => NodeKind::Variable,
            "output" => NodeKind::Output,
            "module_call" | "module-call" => NodeKind::ModuleCall,
            "local" => NodeKind::Local,
            "provider" => NodeKind::Provider,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from_str(&s)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of directed relations between nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RelationKind {
    Imports,
    References,
    DependsOn,
    Custom(String),
}

#[allow(clippy::should_implement_trait)]
impl RelationKind {
    /// Returns the string representation of this relation kind.
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::Imports => "imports",
            RelationKind::References => "references",
            RelationKind::DependsOn => "depends_on",
            RelationKind::Custom(name) => name,
        }
    }

    /// Parses a string into a `RelationKind`. Unrecognized names become `Custom`.
    pub fn from_str(s: &str) -> RelationKind {
        match s {
            "imports" => RelationKind::Imports,
            "references" => RelationKind::References,
            "depends_on" | "depends-on" => RelationKind::DependsOn,
            other => RelationKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for RelationKind {
    fn from(s: String) -> Self {
        RelationKind::from_str(&s)
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Relations compare, hash and order by their textual name, so a `Custom`
// spelling of a built-in relation is the same relation, and sorted edge lists
// match the canonical JSON ordering.
impl PartialEq for RelationKind {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RelationKind {}

impl Hash for RelationKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for RelationKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelationKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// A language-specific attribute value attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(n) => write!(f, "{n}"),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

impl From<usize> for MetadataValue {
    fn from(n: usize) -> Self {
        MetadataValue::Number(n as f64)
    }
}

/// Ordered mapping of node attributes.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A node in the dependency graph: one module, file, resource, variable, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Always absolute, so same-named components in different directories
    /// never collide.
    pub absolute_path: PathBuf,
    pub metadata: Metadata,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, absolute_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            kind,
            absolute_path: absolute_path.into(),
            metadata: Metadata::new(),
        }
    }

    /// Adds a metadata entry, returning the node for chaining.
    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A directed dependency `from -> to`.
///
/// Field order gives the derived ordering `(from, to, relation)`, which is the
/// canonical edge order everywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: RelationKind,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, relation: RelationKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation,
        }
    }
}

/// A non-fatal problem encountered while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildWarning {
    /// A reference could not be mapped to any node; no edge was created.
    UnresolvedReference {
        from: String,
        reference: String,
        file: String,
        reason: String,
    },
    /// An edge named an endpoint missing from the node set and was dropped.
    DanglingEdge {
        from: String,
        to: String,
        relation: RelationKind,
    },
    /// Two files declare the same module id; only `kept` contributes to the
    /// graph.
    ShadowedModule {
        module: String,
        kept: String,
        ignored: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::UnresolvedReference {
                from,
                reference,
                file,
                reason,
            } => write!(
                f,
                "unresolved reference '{reference}' from {from} ({file}): {reason}"
            ),
            BuildWarning::DanglingEdge { from, to, relation } => {
                write!(f, "dropped dangling edge {from} -[{relation}]-> {to}")
            }
            BuildWarning::ShadowedModule {
                module,
                kept,
                ignored,
            } => write!(f, "module {module} is declared by {kept} and {ignored}; ignored {ignored}"),
        }
    }
}

/// One circular dependency: a simple cycle `n0 -> n1 -> ... -> nk -> n0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
}

impl Cycle {
    /// The node the cycle starts at (the smallest id of its component).
    pub fn start(&self) -> &str {
        self.nodes.first().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renders the cycle as an arrow-joined closed path, e.g. `a -> b -> a`.
    pub fn render(&self) -> String {
        let mut parts: Vec<&str> = self.nodes.iter().map(String::as_str).collect();
        if let Some(first) = self.nodes.first() {
            parts.push(first);
        }
        parts.join(" -> ")
    }
}

/// One symbol extracted from a source file by the external parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Path relative to the symbol table root (absolute paths are accepted).
    pub file_path: String,
    pub symbol_name: String,
    pub symbol_kind: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// The externally extracted symbol/reference data for one repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub records: Vec<SymbolRecord>,
}

impl SymbolTable {
    /// Returns the records grouped by file, files in sorted order and records
    /// in their original order within each file.
    pub fn by_file(&self) -> BTreeMap<&str, Vec<&SymbolRecord>> {
        let mut files: BTreeMap<&str, Vec<&SymbolRecord>> = BTreeMap::new();
        for record in &self.records {
            files.entry(record.file_path.as_str()).or_default().push(record);
        }
        files
    }

    /// Canonical absolute path of a record path, joined onto the root unless
    /// it is already absolute.
    pub fn absolute_path(&self, file_path: &str) -> PathBuf {
        let path = PathBuf::from(file_path);
        if path.is_absolute() {
            canonical_path(&path)
        } else {
            canonical_path(&self.root.join(path))
        }
    }
}

/// Canonical absolute form of `path`.
///
/// Existing paths are resolved through the filesystem. Paths that do not
/// exist are made absolute against the working directory with `.` and `..`
/// folded lexically.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Path and modification signature of one in-scope file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileSignature {
    pub path: String,
    pub signature: String,
}

/// Upper limits on indirect traversals.
///
/// Indirect queries stop expanding once either limit is hit; whatever was
/// discovered up to that point is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalBounds {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for TraversalBounds {
    fn default() -> Self {
        TraversalBounds {
            max_depth: 256,
            max_nodes: 50_000,
        }
    }
}

/// Aggregate counts describing a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub warning_count: usize,
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub edges_by_relation: BTreeMap<String, usize>,
}

/// Interchange formats the exporter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Dot,
    GraphMl,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Dot => "dot",
            ExportFormat::GraphMl => "graphml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = DepGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            "graphml" => Ok(ExportFormat::GraphMl),
            other => Err(DepGraphError::Parse {
                message: format!("unknown export format '{other}' (expected json, dot or graphml)"),
                format: "export-format".to_string(),
            }),
        }
    }
}

/// Markup used by the context summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    Markdown,
    Text,
}

impl FromStr for ContextFormat {
    type Err = DepGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ContextFormat::Markdown),
            "text" | "plain" | "txt" => Ok(ContextFormat::Text),
            other => Err(DepGraphError::Parse {
                message: format!("unknown context format '{other}' (expected markdown or text)"),
                format: "context-format".to_string(),
            }),
        }
    }
}
