//! Language resolvers.
//!
//! A resolver turns the externally extracted symbol table of a repository into
//! typed nodes and dependency edges. Per-file work runs on the rayon pool;
//! partial results are merged single-threaded in file order so the output
//! never depends on which worker finished first.

mod python;
mod terraform;

pub use python::ModuleImportResolver;
pub use terraform::InfrastructureResolver;

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;

use crate::errors::{DepGraphError, Result};
use crate::types::{BuildWarning, Edge, Node, SymbolRecord, SymbolTable};

/// Output of one resolver pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Nodes in deterministic (file, declaration) order. Ids may repeat; the
    /// graph builder merges duplicates.
    pub nodes: Vec<Node>,
    pub edges: BTreeSet<Edge>,
    pub warnings: Vec<BuildWarning>,
}

/// Nodes, edges and warnings produced for a single file.
#[derive(Debug, Default)]
pub(crate) struct FilePartial {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub warnings: Vec<BuildWarning>,
}

impl Resolution {
    /// Folds per-file partials, which must already be in file order.
    pub(crate) fn from_partials(partials: Vec<FilePartial>) -> Self {
        let mut resolution = Resolution::default();
        for partial in partials {
            resolution.nodes.extend(partial.nodes);
            resolution.edges.extend(partial.edges);
            resolution.warnings.extend(partial.warnings);
        }
        resolution
    }
}

/// Language-specific resolution of extracted symbols into graph elements.
///
/// Implementations must be pure: the same symbol table always yields the same
/// nodes, the same edge set and the same warnings.
pub trait LanguageResolver: Send + Sync {
    /// Canonical language name, e.g. `"python"`.
    fn language_name(&self) -> &str;

    /// Other names this resolver answers to in configuration and on the CLI.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    fn resolve(&self, table: &SymbolTable) -> Resolution;
}

/// Registry of all available resolvers, looked up by language name.
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn LanguageResolver>>,
}

impl ResolverRegistry {
    /// Creates a registry with every built-in resolver.
    pub fn new() -> Self {
        Self {
            resolvers: vec![
                Arc::new(ModuleImportResolver),
                Arc::new(InfrastructureResolver),
            ],
        }
    }

    /// Returns the resolver for `language` (case-insensitive, aliases allowed).
    pub fn resolver_for(&self, language: &str) -> Result<Arc<dyn LanguageResolver>> {
        let wanted = language.trim().to_ascii_lowercase();
        self.resolvers
            .iter()
            .find(|r| r.language_name() == wanted || r.aliases().contains(&wanted.as_str()))
            .cloned()
            .ok_or_else(|| DepGraphError::UnsupportedLanguage {
                language: language.to_string(),
                supported: self.supported_languages().join(", "),
            })
    }

    pub fn supported_languages(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.language_name()).collect()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `ResolverRegistry::new().resolver_for(language)`.
pub fn resolver_for(language: &str) -> Result<Arc<dyn LanguageResolver>> {
    ResolverRegistry::new().resolver_for(language)
}

/// Runs `f` once per file of `table` on the rayon pool and returns the results
/// in sorted file order.
pub(crate) fn per_file<T, F>(table: &SymbolTable, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&str, &[&SymbolRecord]) -> T + Sync + Send,
{
    let files: Vec<(&str, Vec<&SymbolRecord>)> = table.by_file().into_iter().collect();
    files
        .par_iter()
        .map(|(path, records)| f(*path, records.as_slice()))
        .collect()
}

/// Strips `root` from an absolute record path and normalizes separators.
pub(crate) fn relative_path(table: &SymbolTable, file_path: &str) -> String {
    let path = std::path::Path::new(file_path);
    let relative = if path.is_absolute() {
        path.strip_prefix(&table.root).unwrap_or(path)
    } else {
        path
    };
    relative
        .to_string_lossy()
        .replace('\\', "/")
        .trim_start_matches("./")
        .to_string()
}
