//! Graph assembly and the build cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::graph::model::{DependencyGraph, EdgeInsert, NodeInsert};
use crate::repository::RepositorySnapshot;
use crate::resolution::{LanguageResolver, Resolution};
use crate::types::BuildWarning;

/// The last built graph together with the signature it was built from.
#[derive(Debug, Clone)]
struct CacheEntry {
    signature: String,
    graph: Arc<DependencyGraph>,
}

/// Builds dependency graphs from repository snapshots and caches the result.
///
/// Builds are serialized through `build_lock`. The cache itself sits behind a
/// separate `RwLock` that is only held for the pointer swap, so readers of an
/// already-built graph never wait for a build in progress.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    cache: RwLock<Option<CacheEntry>>,
    build_lock: Mutex<()>,
    resolver_runs: AtomicUsize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the graph for `snapshot`, running `resolver` only when the
    /// cache is empty, stale, or `force` is set.
    pub fn build(
        &self,
        snapshot: &RepositorySnapshot,
        resolver: &dyn LanguageResolver,
        force: bool,
    ) -> Arc<DependencyGraph> {
        let signature = snapshot.signature();

        if !force {
            if let Some(graph) = self.cached_for(&signature) {
                debug!(signature = %signature, "dependency graph cache hit");
                return graph;
            }
        }

        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // A concurrent caller may have finished the same build while we waited.
        if !force {
            if let Some(graph) = self.cached_for(&signature) {
                debug!(signature = %signature, "dependency graph built by concurrent caller");
                return graph;
            }
        }

        let start = Instant::now();
        self.resolver_runs.fetch_add(1, Ordering::SeqCst);
        let resolution = resolver.resolve(&snapshot.symbols);
        let graph = Arc::new(assemble(resolution, Some(signature.clone())));

        info!(
            language = resolver.language_name(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            warnings = graph.warnings().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "dependency graph built"
        );

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CacheEntry {
            signature,
            graph: Arc::clone(&graph),
        });
        graph
    }

    /// The currently cached graph, if any.
    pub fn cached(&self) -> Option<Arc<DependencyGraph>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|entry| Arc::clone(&entry.graph))
    }

    /// Drops the cached graph; the next build always runs the resolver.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
    }

    /// Number of resolver passes this builder has executed.
    pub fn resolver_runs(&self) -> usize {
        self.resolver_runs.load(Ordering::SeqCst)
    }

    fn cached_for(&self, signature: &str) -> Option<Arc<DependencyGraph>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|entry| entry.signature == signature)
            .map(|entry| Arc::clone(&entry.graph))
    }
}

/// Assembles a resolver's output into a graph.
///
/// Nodes are inserted in resolution order with duplicate ids merged; edges
/// follow in canonical `(from, to, relation)` order. Edges naming an unknown
/// endpoint are dropped and recorded as warnings.
pub fn assemble(resolution: Resolution, signature: Option<String>) -> DependencyGraph {
    let Resolution {
        nodes,
        edges,
        warnings,
    } = resolution;

    let mut graph = DependencyGraph::new();
    for node in nodes {
        let id = node.id.clone();
        if let NodeInsert::KindConflict { kept, ignored, .. } = graph.add_node(node) {
            warn!(
                node = %id,
                kept = %kept,
                ignored = %ignored,
                "duplicate node id with a different kind; keeping the first kind"
            );
        }
    }

    let unresolved = warnings.len();
    for warning in warnings {
        graph.push_warning(warning);
    }

    let mut dangling = 0usize;
    for edge in edges {
        if graph.add_edge(edge.clone()) == EdgeInsert::Dangling {
            dangling += 1;
            graph.push_warning(BuildWarning::DanglingEdge {
                from: edge.from,
                to: edge.to,
                relation: edge.relation,
            });
        }
    }

    if unresolved > 0 || dangling > 0 {
        warn!(unresolved, dangling, "dependency graph built with warnings");
    }

    if let Some(signature) = signature {
        graph.set_signature(signature);
    }
    graph
}
