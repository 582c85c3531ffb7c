use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during dependency graph operations.
///
/// Resolver-level problems are never errors: they are collected as
/// [`crate::types::BuildWarning`]s on the built graph.
#[derive(Error, Debug)]
pub enum DepGraphError {
    #[error("unsupported language: {language} (supported: {supported})")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("unknown node: {id}")]
    UnknownNode { id: String },

    #[error("export error: failed to write '{}': {source}", path.display())]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symbol table error: {message} (path: {path})")]
    SymbolTable { message: String, path: String },

    #[error("snapshot error: {message} (root: {root})")]
    Snapshot { message: String, root: String },

    #[error("parse error: {message} (format: {format})")]
    Parse { message: String, format: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `DepGraphError`.
pub type Result<T> = std::result::Result<T, DepGraphError>;
