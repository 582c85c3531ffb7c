use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{DepGraphError, Result};
use crate::types::TraversalBounds;

/// Name of the configuration file stored inside the `.depgraph` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory used to store depgraph metadata.
pub const DEPGRAPH_DIR: &str = ".depgraph";

/// Default location of the extracted symbol table, relative to the root.
pub const DEFAULT_SYMBOLS_FILE: &str = ".depgraph/symbols.json";

/// Configuration for one analyzed repository.
///
/// Selects the resolver, controls which files count towards the snapshot
/// signature, and bounds the query and summary layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepGraphConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Resolver language, e.g. `python` or `terraform`.
    pub language: String,
    /// Glob patterns for files in scope.
    pub include: Vec<String>,
    /// Glob patterns for files out of scope. Exclude wins over include.
    pub exclude: Vec<String>,
    /// Path of the extracted symbol table, relative to the repository root.
    pub symbols_file: String,
    /// Maximum file size in bytes; larger files are left out of the snapshot.
    pub max_file_size: u64,
    /// Maximum BFS depth for indirect dependency queries.
    pub max_traversal_depth: usize,
    /// Maximum number of nodes an indirect query returns.
    pub max_traversal_nodes: usize,
    /// Number of hubs listed by the context summarizer.
    pub hub_limit: usize,
}

impl Default for DepGraphConfig {
    fn default() -> Self {
        let bounds = TraversalBounds::default();
        Self {
            version: 1,
            language: "python".to_string(),
            include: vec![
                "**/*.py".to_string(),
                "**/*.pyi".to_string(),
                "**/*.tf".to_string(),
            ],
            exclude: vec![
                ".git/**".to_string(),
                ".depgraph/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/.terraform/**".to_string(),
                "**/.venv/**".to_string(),
                "venv/**".to_string(),
                "build/**".to_string(),
                "dist/**".to_string(),
                "node_modules/**".to_string(),
            ],
            symbols_file: DEFAULT_SYMBOLS_FILE.to_string(),
            max_file_size: 1_048_576,
            max_traversal_depth: bounds.max_depth,
            max_traversal_nodes: bounds.max_nodes,
            hub_limit: 5,
        }
    }
}

impl DepGraphConfig {
    /// Returns a default configuration for `language`.
    pub fn for_language(language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..Self::default()
        }
    }

    /// Traversal bounds for indirect queries.
    pub fn traversal_bounds(&self) -> TraversalBounds {
        TraversalBounds {
            max_depth: self.max_traversal_depth.max(1),
            max_nodes: self.max_traversal_nodes,
        }
    }

    /// Absolute path of the symbol table for a repository rooted at `root`.
    pub fn symbols_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.symbols_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

/// Returns the path to the `.depgraph` directory within the given root.
pub fn get_depgraph_dir(project_root: &Path) -> PathBuf {
    project_root.join(DEPGRAPH_DIR)
}

/// Returns the path to `config.json` within the `.depgraph` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_depgraph_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk, or the defaults when no file exists.
pub fn load_config(project_root: &Path) -> Result<DepGraphConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(DepGraphConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| DepGraphError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: DepGraphConfig =
        serde_json::from_str(&contents).map_err(|e| DepGraphError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place, so a
/// partial write never corrupts the configuration.
pub fn save_config(project_root: &Path, config: &DepGraphConfig) -> Result<()> {
    let depgraph_dir = get_depgraph_dir(project_root);
    fs::create_dir_all(&depgraph_dir).map_err(|e| DepGraphError::Config {
        message: format!(
            "failed to create depgraph directory '{}': {}",
            depgraph_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| DepGraphError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| DepGraphError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| DepGraphError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Determines whether a file is in scope under the include and exclude
/// glob patterns. Exclude patterns take precedence.
pub fn should_include_file(file_path: &str, config: &DepGraphConfig) -> bool {
    let match_opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    for pattern_str in &config.exclude {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches_with(file_path, match_opts) {
                return false;
            }
        }
    }

    for pattern_str in &config.include {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches_with(file_path, match_opts) {
                return true;
            }
        }
    }

    false
}
