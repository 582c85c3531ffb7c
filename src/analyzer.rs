use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{load_config, DepGraphConfig};
use crate::context::{generate_context_with, ContextOptions};
use crate::errors::Result;
use crate::export::{export, write_atomic, ExportOutput};
use crate::graph::{cycles, DependencyGraph, GraphBuilder, GraphQuery};
use crate::repository::{FsRepository, SnapshotSource};
use crate::resolution::{resolver_for, LanguageResolver};
use crate::types::{BuildWarning, ContextFormat, ExportFormat, NodeKind, TraversalBounds};

/// Entry point binding one repository, one resolver and one graph builder.
///
/// Query operations run against the cached graph. When nothing has been built
/// yet they build it first with default settings.
pub struct DependencyAnalyzer {
    source: Box<dyn SnapshotSource>,
    resolver: Arc<dyn LanguageResolver>,
    builder: GraphBuilder,
    bounds: TraversalBounds,
    hub_limit: usize,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl DependencyAnalyzer {
    /// Creates an analyzer over an arbitrary snapshot source.
    pub fn new(source: impl SnapshotSource + 'static, resolver: Arc<dyn LanguageResolver>) -> Self {
        let defaults = DepGraphConfig::default();
        Self {
            source: Box::new(source),
            resolver,
            builder: GraphBuilder::new(),
            bounds: defaults.traversal_bounds(),
            hub_limit: defaults.hub_limit,
        }
    }

    /// Opens the repository at `root` using its `.depgraph/config.json`, or
    /// the defaults when there is none.
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(root)?;
        Self::with_config(root, config)
    }

    /// Opens the repository at `root` with an explicit configuration.
    pub fn with_config(root: &Path, config: DepGraphConfig) -> Result<Self> {
        let resolver = resolver_for(&config.language)?;
        let bounds = config.traversal_bounds();
        let hub_limit = config.hub_limit;
        Ok(Self::new(FsRepository::new(root, config), resolver)
            .with_bounds(bounds)
            .with_hub_limit(hub_limit))
    }

    pub fn with_bounds(mut self, bounds: TraversalBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_hub_limit(mut self, hub_limit: usize) -> Self {
        self.hub_limit = hub_limit;
        self
    }

    pub fn root(&self) -> &Path {
        self.source.root()
    }

    pub fn resolver(&self) -> &dyn LanguageResolver {
        self.resolver.as_ref()
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

impl DependencyAnalyzer {
    /// Builds the graph, reusing the cached one when the repository has not
    /// changed since the last build.
    pub fn build_dependency_graph(&self) -> Result<Arc<DependencyGraph>> {
        self.build(false)
    }

    /// Builds the graph; `force` bypasses the cache.
    pub fn build(&self, force: bool) -> Result<Arc<DependencyGraph>> {
        let snapshot = self.source.snapshot()?;
        Ok(self.builder.build(&snapshot, self.resolver.as_ref(), force))
    }

    /// The cached graph, built on first use.
    pub fn graph(&self) -> Result<Arc<DependencyGraph>> {
        match self.builder.cached() {
            Some(graph) => Ok(graph),
            None => {
                debug!(root = %self.root().display(), "no graph built yet; building");
                self.build(false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis and export
// ---------------------------------------------------------------------------

impl DependencyAnalyzer {
    /// Circular dependencies as node-id sequences, sorted by starting id.
    pub fn find_cycles(&self) -> Result<Vec<Vec<String>>> {
        let graph = self.graph()?;
        Ok(cycles::find_cycles(&graph)
            .iter()
            .map(|cycle| cycle.nodes.clone())
            .collect())
    }

    /// Exports the graph as a string, or to `path` when one is given.
    pub fn export_dependency_graph(
        &self,
        format: ExportFormat,
        path: Option<&Path>,
    ) -> Result<ExportOutput> {
        let graph = self.graph()?;
        export(&graph, format, path)
    }

    /// Summarizes the graph within `max_tokens`; also writes the summary to
    /// `path` when one is given.
    pub fn generate_llm_context(
        &self,
        max_tokens: usize,
        format: ContextFormat,
        path: Option<&Path>,
    ) -> Result<String> {
        let graph = self.graph()?;
        let options = ContextOptions {
            max_tokens,
            format,
            hub_limit: self.hub_limit,
        };
        let context = generate_context_with(&graph, &options);
        if let Some(path) = path {
            write_atomic(path, &context)?;
        }
        Ok(context)
    }

    /// Build warnings of the current graph.
    pub fn warnings(&self) -> Result<Vec<BuildWarning>> {
        Ok(self.graph()?.warnings().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl DependencyAnalyzer {
    pub fn get_dependencies(&self, id: &str, include_indirect: bool) -> Result<Vec<String>> {
        let graph = self.graph()?;
        GraphQuery::with_bounds(&graph, self.bounds).get_dependencies(id, include_indirect)
    }

    pub fn get_dependents(&self, id: &str, include_indirect: bool) -> Result<Vec<String>> {
        let graph = self.graph()?;
        GraphQuery::with_bounds(&graph, self.bounds).get_dependents(id, include_indirect)
    }

    /// Ids of all nodes of `kind` (e.g. `"module"`, `"resource"`), sorted.
    pub fn get_by_kind(&self, kind: &str) -> Result<Vec<String>> {
        let graph = self.graph()?;
        Ok(GraphQuery::new(&graph).get_by_kind(&NodeKind::from_str(kind)))
    }
}
