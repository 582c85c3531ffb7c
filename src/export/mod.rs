//! Graph export to JSON, DOT and GraphML.
//!
//! JSON is the canonical, round-trippable format; DOT and GraphML are meant
//! for visualization tools. Every format orders nodes by id and edges by
//! `(from, to, relation)`, so equal graphs always export byte-identically.

mod dot;
mod graphml;
mod json;

pub use dot::render_dot;
pub use graphml::render_graphml;
pub use json::{parse_json, render_json};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{DepGraphError, Result};
use crate::graph::model::DependencyGraph;
use crate::types::ExportFormat;

/// Result of an export: the rendered content, or the file it was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    Content(String),
    Written(PathBuf),
}

impl ExportOutput {
    /// The rendered content, if the export was not written to a file.
    pub fn content(&self) -> Option<&str> {
        match self {
            ExportOutput::Content(content) => Some(content),
            ExportOutput::Written(_) => None,
        }
    }
}

/// Renders `graph` in `format` without touching the filesystem.
pub fn render(graph: &DependencyGraph, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => render_json(graph),
        ExportFormat::Dot => Ok(render_dot(graph)),
        ExportFormat::GraphMl => Ok(render_graphml(graph)),
    }
}

/// Renders `graph` and either returns the content or writes it to `path`.
///
/// Write failures surface as [`DepGraphError::ExportIo`] naming the path; the
/// graph itself is never modified.
pub fn export(
    graph: &DependencyGraph,
    format: ExportFormat,
    path: Option<&Path>,
) -> Result<ExportOutput> {
    let content = render(graph, format)?;
    match path {
        None => Ok(ExportOutput::Content(content)),
        Some(path) => {
            write_atomic(path, &content)?;
            debug!(path = %path.display(), format = format.as_str(), "graph exported");
            Ok(ExportOutput::Written(path.to_path_buf()))
        }
    }
}

/// Writes `content` to a sibling temporary file and renames it into place.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let io_err = |source: std::io::Error| DepGraphError::ExportIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content).map_err(io_err)?;
    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(source));
    }
    Ok(())
}
