use depgraph::config::*;
use tempfile::TempDir;

#[test]
fn test_default_config_covers_supported_languages() {
    let config = DepGraphConfig::default();
    assert_eq!(config.language, "python");
    assert!(config.include.iter().any(|p| p == "**/*.py"));
    assert!(config.include.iter().any(|p| p == "**/*.tf"));
    assert!(config.exclude.iter().any(|p| p == ".depgraph/**"));
    assert_eq!(config.symbols_file, DEFAULT_SYMBOLS_FILE);
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let config = DepGraphConfig {
        max_traversal_depth: 3,
        hub_limit: 2,
        ..DepGraphConfig::for_language("terraform")
    };
    save_config(dir.path(), &config).unwrap();
    assert!(get_config_path(dir.path()).exists());
    assert!(!get_config_path(dir.path()).with_extension("tmp").exists());

    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, DepGraphConfig::default());
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(get_depgraph_dir(dir.path())).unwrap();
    std::fs::write(get_config_path(dir.path()), r#"{"language": "tf"}"#).unwrap();

    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded.language, "tf");
    assert_eq!(loaded.max_file_size, DepGraphConfig::default().max_file_size);
}

#[test]
fn test_invalid_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(get_depgraph_dir(dir.path())).unwrap();
    std::fs::write(get_config_path(dir.path()), "{not json").unwrap();

    let err = load_config(dir.path()).unwrap_err();
    assert!(matches!(err, depgraph::errors::DepGraphError::Config { .. }));
}

#[test]
fn test_should_include_file() {
    let config = DepGraphConfig::default();
    assert!(should_include_file("app.py", &config));
    assert!(should_include_file("pkg/sub/mod.py", &config));
    assert!(should_include_file("infra/main.tf", &config));
    assert!(!should_include_file("README.md", &config));
    assert!(!should_include_file("pkg/__pycache__/mod.py", &config));
    assert!(!should_include_file(".depgraph/symbols.json", &config));
}

#[test]
fn test_traversal_bounds_come_from_config() {
    let config = DepGraphConfig {
        max_traversal_depth: 0,
        max_traversal_nodes: 10,
        ..DepGraphConfig::default()
    };
    let bounds = config.traversal_bounds();
    assert_eq!(bounds.max_depth, 1);
    assert_eq!(bounds.max_nodes, 10);
}

#[test]
fn test_symbols_path_is_relative_to_root() {
    let dir = TempDir::new().unwrap();
    let config = DepGraphConfig::default();
    assert_eq!(
        config.symbols_path(dir.path()),
        dir.path().join(".depgraph").join("symbols.json")
    );
}
