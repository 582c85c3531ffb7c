//! Repository snapshots.
//!
//! A snapshot pairs the in-scope files of a repository (with one modification
//! signature per file) and the symbol table the external parser extracted from
//! them. The graph builder keys its cache on the snapshot signature.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::{should_include_file, DepGraphConfig};
use crate::errors::{DepGraphError, Result};
use crate::signature::{modification_signature, snapshot_signature};
use crate::types::{canonical_path, FileSignature, SymbolTable};

/// Everything the builder needs from a repository at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositorySnapshot {
    pub root: PathBuf,
    /// In-scope files, sorted by path.
    pub files: Vec<FileSignature>,
    pub symbols: SymbolTable,
}

impl RepositorySnapshot {
    pub fn new(root: impl Into<PathBuf>, mut files: Vec<FileSignature>, symbols: SymbolTable) -> Self {
        files.sort_unstable();
        Self {
            root: root.into(),
            files,
            symbols,
        }
    }

    /// Content signature over every file path and its modification signature.
    pub fn signature(&self) -> String {
        snapshot_signature(&self.files)
    }
}

/// Something that can produce a fresh repository snapshot on demand.
pub trait SnapshotSource: Send + Sync {
    fn root(&self) -> &Path;

    fn snapshot(&self) -> Result<RepositorySnapshot>;
}

impl SnapshotSource for RepositorySnapshot {
    fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot(&self) -> Result<RepositorySnapshot> {
        Ok(self.clone())
    }
}

/// Filesystem-backed repository.
///
/// Enumerates files with the `ignore` walker, so `.gitignore` and `.ignore`
/// rules apply, then filters them through the configured glob patterns and
/// size limit. The symbol table file is read on every snapshot and always
/// counts towards the signature.
pub struct FsRepository {
    root: PathBuf,
    config: DepGraphConfig,
}

impl FsRepository {
    /// Opens `root`, canonicalized so every node path comes out absolute.
    pub fn new(root: impl Into<PathBuf>, config: DepGraphConfig) -> Self {
        Self {
            root: canonical_path(&root.into()),
            config,
        }
    }

    pub fn config(&self) -> &DepGraphConfig {
        &self.config
    }

    /// Lists in-scope files relative to the root, sorted.
    pub fn scan_files(&self) -> Result<Vec<FileSignature>> {
        if !self.root.is_dir() {
            return Err(DepGraphError::Snapshot {
                message: "repository root is not a directory".to_string(),
                root: self.root.display().to_string(),
            });
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .require_git(false)
            .filter_entry(|e| e.file_name() != ".git")
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let rel_str = relative.to_string_lossy().replace('\\', "/");
            if !should_include_file(&rel_str, &self.config) {
                continue;
            }
            if let Some(signature) = file_signature(path, self.config.max_file_size) {
                files.push(FileSignature {
                    path: rel_str,
                    signature,
                });
            }
        }

        files.sort_unstable();
        Ok(files)
    }

    /// Reads the extracted symbol table. A missing file yields an empty table.
    pub fn read_symbols(&self) -> Result<SymbolTable> {
        let path = self.config.symbols_path(&self.root);
        if !path.exists() {
            debug!(path = %path.display(), "no symbol table found; using an empty one");
            return Ok(SymbolTable {
                root: self.root.clone(),
                records: Vec::new(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|e| DepGraphError::SymbolTable {
            message: format!("failed to read symbol table: {e}"),
            path: path.display().to_string(),
        })?;
        load_symbol_table(&contents, &self.root).map_err(|e| DepGraphError::SymbolTable {
            message: e.to_string(),
            path: path.display().to_string(),
        })
    }
}

impl SnapshotSource for FsRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot(&self) -> Result<RepositorySnapshot> {
        let mut files = self.scan_files()?;

        let symbols_path = self.config.symbols_path(&self.root);
        let symbols_rel = symbols_path
            .strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| symbols_path.display().to_string());
        if !files.iter().any(|f| f.path == symbols_rel) {
            if let Some(signature) = file_signature(&symbols_path, u64::MAX) {
                files.push(FileSignature {
                    path: symbols_rel,
                    signature,
                });
            }
        }

        let symbols = self.read_symbols()?;
        Ok(RepositorySnapshot::new(self.root.clone(), files, symbols))
    }
}

/// Parses a symbol table document.
///
/// Accepts either a bare array of records or an object with a `records`
/// array; `root` fills in when the document does not carry one. A relative
/// document root is taken relative to `root`. The resulting root is always
/// canonical.
pub fn load_symbol_table(contents: &str, root: &Path) -> Result<SymbolTable> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    let mut table: SymbolTable = if value.is_array() {
        SymbolTable {
            root: PathBuf::new(),
            records: serde_json::from_value(value)?,
        }
    } else {
        serde_json::from_value(value)?
    };
    table.root = canonical_path(&root.join(&table.root));
    Ok(table)
}

/// Size-and-mtime signature of a file, or `None` when it is unreadable or
/// larger than `max_size`.
fn file_signature(path: &Path, max_size: u64) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.len() > max_size {
        return None;
    }
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Some(modification_signature(metadata.len(), modified))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_accepts_bare_record_arrays() {
        let json = r#"[{"file_path": "a.py", "symbol_name": "b", "symbol_kind": "import"}]"#;
        let table = load_symbol_table(json, Path::new("/repo")).unwrap();
        assert_eq!(table.root, PathBuf::from("/repo"));
        assert_eq!(table.records.len(), 1);
        assert!(table.records[0].references.is_empty());
    }

    #[test]
    fn symbol_table_keeps_its_own_root() {
        let json = r#"{"root": "/elsewhere", "records": []}"#;
        let table = load_symbol_table(json, Path::new("/repo")).unwrap();
        assert_eq!(table.root, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn relative_symbol_table_root_is_resolved_against_the_repository() {
        let json = r#"{"root": "./src/../lib", "records": []}"#;
        let table = load_symbol_table(json, Path::new("/repo")).unwrap();
        assert_eq!(table.root, PathBuf::from("/repo/lib"));
    }

    #[test]
    fn snapshot_signature_is_stable_under_file_order() {
        let files = vec![
            FileSignature {
                path: "b.py".into(),
                signature: "1".into(),
            },
            FileSignature {
                path: "a.py".into(),
                signature: "2".into(),
            },
        ];
        let mut reversed = files.clone();
        reversed.reverse();
        let a = RepositorySnapshot::new("/r", files, SymbolTable::default());
        let b = RepositorySnapshot::new("/r", reversed, SymbolTable::default());
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.files[0].path, "a.py");
    }
}
