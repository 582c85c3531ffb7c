use std::fs;
use std::path::Path;

use depgraph::analyzer::DependencyAnalyzer;
use depgraph::config::{save_config, DepGraphConfig};
use depgraph::errors::DepGraphError;
use depgraph::export::{parse_json, ExportOutput};
use depgraph::repository::{FsRepository, SnapshotSource};
use depgraph::types::{ContextFormat, ExportFormat};
use tempfile::TempDir;

const SYMBOLS: &str = r#"{
    "records": [
        {"file_path": "app.py", "symbol_name": "main", "symbol_kind": "function"},
        {"file_path": "app.py", "symbol_name": "pkg.core", "symbol_kind": "import"},
        {"file_path": "pkg/__init__.py", "symbol_name": "pkg", "symbol_kind": "package"},
        {"file_path": "pkg/core.py", "symbol_name": ".util", "symbol_kind": "import_from"},
        {"file_path": "pkg/util.py", "symbol_name": "pkg.core", "symbol_kind": "import"},
        {"file_path": "pkg/util.py", "symbol_name": "yaml", "symbol_kind": "import"}
    ]
}"#;

/// Creates a small Python project with an extracted symbol table.
fn setup_project(project: &Path) {
    fs::create_dir_all(project.join("pkg")).unwrap();
    fs::create_dir_all(project.join(".depgraph")).unwrap();
    fs::write(project.join("app.py"), "import pkg.core\n").unwrap();
    fs::write(project.join("pkg/__init__.py"), "").unwrap();
    fs::write(project.join("pkg/core.py"), "from . import util\n").unwrap();
    fs::write(project.join("pkg/util.py"), "import pkg.core\nimport yaml\n").unwrap();
    fs::write(project.join("notes.txt"), "not a source file").unwrap();
    fs::write(project.join(".depgraph/symbols.json"), SYMBOLS).unwrap();
}

#[test]
fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);

    let analyzer = DependencyAnalyzer::open(project).unwrap();

    // Build
    let graph = analyzer.build_dependency_graph().unwrap();
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);

    // Cycles
    assert_eq!(
        analyzer.find_cycles().unwrap(),
        vec![vec!["pkg.core".to_string(), "pkg.util".to_string()]]
    );

    // Queries
    assert_eq!(analyzer.get_dependencies("app", false).unwrap(), vec!["pkg.core"]);
    assert_eq!(
        analyzer.get_dependencies("app", true).unwrap(),
        vec!["pkg.core", "pkg.util"]
    );
    assert_eq!(analyzer.get_dependents("pkg.core", false).unwrap(), vec!["app", "pkg.util"]);
    assert_eq!(
        analyzer.get_by_kind("module").unwrap(),
        vec!["app", "pkg", "pkg.core", "pkg.util"]
    );
    assert!(matches!(
        analyzer.get_dependencies("nope", false),
        Err(DepGraphError::UnknownNode { .. })
    ));

    // Warnings
    let warnings = analyzer.warnings().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("yaml"));

    // Export
    let json = analyzer
        .export_dependency_graph(ExportFormat::Json, None)
        .unwrap();
    let reparsed = parse_json(json.content().unwrap()).unwrap();
    assert_eq!(reparsed.node_count(), 4);
    assert_eq!(reparsed.edge_count(), 3);

    // Context
    let context = analyzer
        .generate_llm_context(500, ContextFormat::Markdown, None)
        .unwrap();
    assert!(context.contains("pkg.core -> pkg.util -> pkg.core"));
}

#[test]
fn test_queries_auto_build() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());

    let analyzer = DependencyAnalyzer::open(dir.path()).unwrap();
    assert!(analyzer.builder().cached().is_none());
    assert_eq!(analyzer.get_by_kind("module").unwrap().len(), 4);
    assert_eq!(analyzer.builder().resolver_runs(), 1);

    analyzer.find_cycles().unwrap();
    assert_eq!(analyzer.builder().resolver_runs(), 1);
}

#[test]
fn test_rebuild_only_after_changes() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);

    let analyzer = DependencyAnalyzer::open(project).unwrap();
    analyzer.build_dependency_graph().unwrap();
    analyzer.build_dependency_graph().unwrap();
    assert_eq!(analyzer.builder().resolver_runs(), 1);

    // New in-scope file with different size changes the signature.
    fs::write(project.join("pkg/extra.py"), "x = 1\n").unwrap();
    analyzer.build_dependency_graph().unwrap();
    assert_eq!(analyzer.builder().resolver_runs(), 2);

    // Out-of-scope files do not.
    fs::write(project.join("README.md"), "# readme\n").unwrap();
    analyzer.build_dependency_graph().unwrap();
    assert_eq!(analyzer.builder().resolver_runs(), 2);

    analyzer.build(true).unwrap();
    assert_eq!(analyzer.builder().resolver_runs(), 3);
}

#[test]
fn test_snapshot_respects_globs_and_symbols_file() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);
    fs::create_dir_all(project.join("pkg/__pycache__")).unwrap();
    fs::write(project.join("pkg/__pycache__/core.py"), "").unwrap();

    let repo = FsRepository::new(project, DepGraphConfig::default());
    let snapshot = repo.snapshot().unwrap();
    let paths: Vec<&str> = snapshot.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            ".depgraph/symbols.json",
            "app.py",
            "pkg/__init__.py",
            "pkg/core.py",
            "pkg/util.py",
        ]
    );
    assert_eq!(snapshot.symbols.records.len(), 6);
    assert_eq!(snapshot.symbols.root, project.canonicalize().unwrap());
}

#[test]
fn test_relative_root_yields_absolute_node_paths() {
    let dir = TempDir::new_in(".").unwrap();
    let relative = Path::new(".").join(dir.path().file_name().unwrap());
    setup_project(&relative);

    let analyzer = DependencyAnalyzer::open(&relative).unwrap();
    let graph = analyzer.build_dependency_graph().unwrap();
    assert!(!graph.nodes().is_empty());
    for node in graph.nodes() {
        assert!(
            node.absolute_path.is_absolute(),
            "{} has a relative path: {}",
            node.id,
            node.absolute_path.display()
        );
    }
    assert_eq!(
        graph.node("app").unwrap().absolute_path,
        dir.path().canonicalize().unwrap().join("app.py")
    );
}

#[test]
fn test_gitignore_rules_are_respected() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);
    fs::create_dir_all(project.join("generated")).unwrap();
    fs::write(project.join("generated/out.py"), "").unwrap();
    fs::write(project.join(".gitignore"), "generated/\n").unwrap();

    let repo = FsRepository::new(project, DepGraphConfig::default());
    let files = repo.scan_files().unwrap();
    assert!(files.iter().all(|f| !f.path.starts_with("generated/")));
}

#[test]
fn test_invalid_symbol_table_is_an_error() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);
    fs::write(project.join(".depgraph/symbols.json"), "[{\"oops\": 1}]").unwrap();

    let analyzer = DependencyAnalyzer::open(project).unwrap();
    let err = analyzer.build_dependency_graph().unwrap_err();
    assert!(matches!(err, DepGraphError::SymbolTable { .. }));
}

#[test]
fn test_unsupported_language_fails_on_open() {
    let dir = TempDir::new().unwrap();
    save_config(dir.path(), &DepGraphConfig::for_language("cobol")).unwrap();

    let err = DependencyAnalyzer::open(dir.path()).err().unwrap();
    assert!(matches!(err, DepGraphError::UnsupportedLanguage { .. }));
}

#[test]
fn test_terraform_project() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    fs::create_dir_all(project.join(".depgraph")).unwrap();
    fs::write(project.join("main.tf"), "resource \"aws_s3_bucket\" \"logs\" {}\n").unwrap();
    fs::write(
        project.join(".depgraph/symbols.json"),
        r#"[
            {"file_path": "main.tf", "symbol_name": "aws_s3_bucket.logs", "symbol_kind": "resource",
             "references": ["var.bucket_name"]},
            {"file_path": "variables.tf", "symbol_name": "bucket_name", "symbol_kind": "variable"}
        ]"#,
    )
    .unwrap();
    save_config(project, &DepGraphConfig::for_language("terraform")).unwrap();

    let analyzer = DependencyAnalyzer::open(project).unwrap();
    assert_eq!(
        analyzer.get_dependencies("aws_s3_bucket.logs", false).unwrap(),
        vec!["var.bucket_name"]
    );
    assert_eq!(analyzer.get_by_kind("variable").unwrap(), vec!["var.bucket_name"]);
}

#[test]
fn test_exports_and_context_write_files() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();
    setup_project(project);
    let analyzer = DependencyAnalyzer::open(project).unwrap();

    let dot_path = project.join("out/graph.dot");
    let written = analyzer
        .export_dependency_graph(ExportFormat::Dot, Some(&dot_path))
        .unwrap();
    assert_eq!(written, ExportOutput::Written(dot_path.clone()));
    assert!(fs::read_to_string(&dot_path).unwrap().contains("digraph"));

    let md_path = project.join("out/context.md");
    let context = analyzer
        .generate_llm_context(200, ContextFormat::Text, Some(&md_path))
        .unwrap();
    assert_eq!(fs::read_to_string(&md_path).unwrap(), context);
}
