use std::collections::BTreeMap;

use tracing::warn;

use super::{per_file, relative_path, FilePartial, LanguageResolver, Resolution};
use crate::types::{BuildWarning, Edge, Node, NodeKind, RelationKind, SymbolRecord, SymbolTable};

/// Symbol kinds the extractor emits for import statements.
const IMPORT_KINDS: &[&str] = &["import", "import_from", "from_import"];

/// Source extensions that define a module.
const MODULE_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Resolves Python-style module imports into `imports` edges.
///
/// Every source file becomes a `module` node whose id is its dotted module
/// path relative to the repository root (`pkg/sub/mod.py` is `pkg.sub.mod`,
/// `pkg/__init__.py` is `pkg`). Import records reference module names, which
/// are matched against the longest known module prefix.
pub struct ModuleImportResolver;

/// A module declared by one source file.
#[derive(Debug, Clone)]
struct ModuleDecl {
    id: String,
    relative: String,
    is_package: bool,
}

impl LanguageResolver for ModuleImportResolver {
    fn language_name(&self) -> &str {
        "python"
    }

    fn aliases(&self) -> &[&str] {
        &["py", "module-import"]
    }

    fn resolve(&self, table: &SymbolTable) -> Resolution {
        // Phase 1: one module per file.
        let mut modules: BTreeMap<String, ModuleDecl> = BTreeMap::new();
        let mut file_modules: BTreeMap<String, ModuleDecl> = BTreeMap::new();
        let mut shadowed: Vec<BuildWarning> = Vec::new();
        for (file, _) in table.by_file() {
            let relative = relative_path(table, file);
            let Some(decl) = module_for_path(&relative) else {
                continue;
            };
            match modules.get(&decl.id) {
                // `pkg.py` next to `pkg/__init__.py`: the package wins.
                Some(existing) if existing.is_package || !decl.is_package => {
                    shadowed.push(shadowed_module(&decl.id, &existing.relative, &relative));
                }
                Some(existing) => {
                    shadowed.push(shadowed_module(&decl.id, &relative, &existing.relative));
                    modules.insert(decl.id.clone(), decl.clone());
                }
                None => {
                    modules.insert(decl.id.clone(), decl.clone());
                }
            }
            file_modules.insert(file.to_string(), decl);
        }

        // Phase 2: per-file resolution against the module map.
        let partials = per_file(table, |file, records| {
            match file_modules.get(file) {
                Some(decl) if modules.get(&decl.id).map(|m| &m.relative) == Some(&decl.relative) => {
                    resolve_file(table, file, decl, records, &modules)
                }
                _ => FilePartial::default(),
            }
        });

        let mut resolution = Resolution::from_partials(partials);
        shadowed.append(&mut resolution.warnings);
        resolution.warnings = shadowed;
        resolution
    }
}

fn shadowed_module(module: &str, kept: &str, ignored: &str) -> BuildWarning {
    warn!(
        module = %module,
        kept = %kept,
        ignored = %ignored,
        "two files map to the same module id"
    );
    BuildWarning::ShadowedModule {
        module: module.to_string(),
        kept: kept.to_string(),
        ignored: ignored.to_string(),
    }
}

fn resolve_file(
    table: &SymbolTable,
    file: &str,
    decl: &ModuleDecl,
    records: &[&SymbolRecord],
    modules: &BTreeMap<String, ModuleDecl>,
) -> FilePartial {
    let mut partial = FilePartial::default();

    let symbol_count = records
        .iter()
        .filter(|r| !IMPORT_KINDS.contains(&r.symbol_kind.as_str()))
        .count();

    // Extractor metadata first; the resolver's own keys take precedence.
    let mut node = Node::new(decl.id.clone(), NodeKind::Module, table.absolute_path(file));
    for record in records {
        for (key, value) in &record.metadata {
            node.metadata.insert(key.clone(), value.clone());
        }
    }
    let node = node
        .with_metadata("file", decl.relative.as_str())
        .with_metadata("is_package", if decl.is_package { "true" } else { "false" })
        .with_metadata("symbol_count", symbol_count);
    partial.nodes.push(node);

    for record in records
        .iter()
        .filter(|r| IMPORT_KINDS.contains(&r.symbol_kind.as_str()))
    {
        let targets: Vec<&str> = if record.references.is_empty() {
            vec![record.symbol_name.as_str()]
        } else {
            record.references.iter().map(String::as_str).collect()
        };

        for reference in targets {
            match resolve_import(decl, reference, modules) {
                Ok(Some(target)) => partial
                    .edges
                    .push(Edge::new(decl.id.clone(), target, RelationKind::Imports)),
                Ok(None) => {}
                Err(reason) => partial.warnings.push(BuildWarning::UnresolvedReference {
                    from: decl.id.clone(),
                    reference: reference.to_string(),
                    file: decl.relative.clone(),
                    reason,
                }),
            }
        }
    }

    partial
}

/// Maps a relative source path to its module declaration, or `None` when the
/// file is not a module source.
fn module_for_path(relative: &str) -> Option<ModuleDecl> {
    let (stem, extension) = relative.rsplit_once('.')?;
    if !MODULE_EXTENSIONS.contains(&extension) {
        return None;
    }

    let mut parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
    let is_package = parts.last() == Some(&"__init__");
    if is_package {
        parts.pop();
    }
    if parts.is_empty() {
        // A top-level `__init__.py` has no module name of its own.
        return None;
    }

    Some(ModuleDecl {
        id: parts.join("."),
        relative: relative.to_string(),
        is_package,
    })
}

/// Resolves one import reference from `importer`.
///
/// Returns `Ok(None)` for imports that land back on the importer itself,
/// `Err(reason)` when nothing in the repository matches.
fn resolve_import(
    importer: &ModuleDecl,
    reference: &str,
    modules: &BTreeMap<String, ModuleDecl>,
) -> Result<Option<String>, String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err("empty import".to_string());
    }

    let absolute = if reference.starts_with('.') {
        absolutize_relative(importer, reference)?
    } else {
        reference.to_string()
    };

    let mut candidate = absolute.as_str();
    loop {
        if modules.contains_key(candidate) {
            if candidate == importer.id {
                return Ok(None);
            }
            return Ok(Some(candidate.to_string()));
        }
        match candidate.rsplit_once('.') {
            Some((parent, _)) => candidate = parent,
            None => break,
        }
    }

    Err(format!("no module in the repository matches '{absolute}'"))
}

/// Turns `..pkg.mod` into an absolute dotted path relative to the importer's
/// package.
fn absolutize_relative(importer: &ModuleDecl, reference: &str) -> Result<String, String> {
    let remainder = reference.trim_start_matches('.');
    let dots = reference.len() - remainder.len();

    let mut package: Vec<&str> = importer.id.split('.').collect();
    if !importer.is_package {
        package.pop();
    }
    for _ in 1..dots {
        if package.pop().is_none() {
            return Err("relative import beyond top-level package".to_string());
        }
    }

    let mut parts = package;
    parts.extend(remainder.split('.').filter(|p| !p.is_empty()));
    if parts.is_empty() {
        return Err("relative import beyond top-level package".to_string());
    }
    Ok(parts.join("."))
}
