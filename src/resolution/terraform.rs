use std::collections::HashSet;

use tracing::debug;

use super::{per_file, relative_path, FilePartial, LanguageResolver, Resolution};
use crate::types::{
    BuildWarning, Edge, MetadataValue, Node, NodeKind, RelationKind, SymbolRecord, SymbolTable,
};

/// Reference roots that name built-in values rather than blocks.
const BUILTIN_NAMESPACES: &[&str] = &["count", "each", "path", "self", "terraform"];

/// Resolves infrastructure-as-code blocks and the references between them.
///
/// Each record is one block. `symbol_kind` is the block kind (`resource`,
/// `data`, `variable`, `output`, `module`, `local`, `provider`) and
/// `symbol_name` its label, e.g. `aws_s3_bucket.logs` for a resource. The
/// record's references are the expressions found in the block body.
pub struct InfrastructureResolver;

impl LanguageResolver for InfrastructureResolver {
    fn language_name(&self) -> &str {
        "terraform"
    }

    fn aliases(&self) -> &[&str] {
        &["tf", "hcl", "infrastructure"]
    }

    fn resolve(&self, table: &SymbolTable) -> Resolution {
        let declared: HashSet<String> = per_file(table, |_, records| {
            records
                .iter()
                .filter_map(|r| block_id(r).map(|(id, _)| id))
                .collect::<Vec<_>>()
        })
        .into_iter()
        .flatten()
        .collect();

        let partials = per_file(table, |file, records| {
            resolve_file(table, file, records, &declared)
        });

        Resolution::from_partials(partials)
    }
}

fn resolve_file(
    table: &SymbolTable,
    file: &str,
    records: &[&SymbolRecord],
    declared: &HashSet<String>,
) -> FilePartial {
    let relative = relative_path(table, file);
    let mut partial = FilePartial::default();

    for record in records {
        let Some((id, kind)) = block_id(record) else {
            debug!(
                file = %relative,
                kind = %record.symbol_kind,
                name = %record.symbol_name,
                "skipping record that is not a block"
            );
            continue;
        };

        let mut node = Node::new(id.clone(), kind.clone(), table.absolute_path(file));
        node.metadata = record.metadata.clone();
        node.metadata
            .insert("file".to_string(), MetadataValue::from(relative.as_str()));
        if kind == NodeKind::Resource {
            if let Some((resource_type, resource_name)) = id.split_once('.') {
                node.metadata
                    .insert("resource_type".to_string(), resource_type.into());
                node.metadata
                    .insert("resource_name".to_string(), resource_name.into());
            }
        }
        partial.nodes.push(node);

        for reference in &record.references {
            match parse_reference(reference) {
                Ok(Some((target, relation))) if declared.contains(&target) => {
                    partial.edges.push(Edge::new(id.clone(), target, relation));
                }
                Ok(Some((target, _))) => {
                    partial.warnings.push(BuildWarning::UnresolvedReference {
                        from: id.clone(),
                        reference: reference.clone(),
                        file: relative.clone(),
                        reason: format!("no block declares '{target}'"),
                    });
                }
                Ok(None) => {}
                Err(reason) => partial.warnings.push(BuildWarning::UnresolvedReference {
                    from: id.clone(),
                    reference: reference.clone(),
                    file: relative.clone(),
                    reason,
                }),
            }
        }
    }

    partial
}

/// Returns the node id and kind of a block record, or `None` for records
/// whose kind is not a block kind.
fn block_id(record: &SymbolRecord) -> Option<(String, NodeKind)> {
    let name = record.symbol_name.trim();
    if name.is_empty() {
        return None;
    }

    let typed = |prefix: &str| {
        // Resource labels may arrive split: name in `symbol_name`, type in metadata.
        let label = match record.metadata.get("resource_type") {
            Some(MetadataValue::Text(resource_type)) if !name.contains('.') => {
                format!("{resource_type}.{name}")
            }
            _ => name.to_string(),
        };
        prefixed(prefix, &label)
    };

    let block = match record.symbol_kind.as_str() {
        "resource" => (typed(""), NodeKind::Resource),
        "data" => (typed("data"), NodeKind::Data),
        "variable" => (prefixed("var", name), NodeKind::Variable),
        "output" => (prefixed("output", name), NodeKind::Output),
        "module" => (prefixed("module", name), NodeKind::ModuleCall),
        "local" | "locals" => (prefixed("local", name), NodeKind::Local),
        "provider" => (prefixed("provider", name), NodeKind::Provider),
        _ => return None,
    };
    Some(block)
}

/// Prepends `prefix.` unless `name` already carries it.
fn prefixed(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    match name.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('.') => name.to_string(),
        _ => format!("{prefix}.{name}"),
    }
}

/// Maps a reference expression to the id of the block it points at.
///
/// `Ok(None)` means the expression names a built-in value and is ignored.
fn parse_reference(expression: &str) -> Result<Option<(String, RelationKind)>, String> {
    let cleaned = strip_indices(
        expression
            .trim()
            .trim_start_matches("${")
            .trim_end_matches('}')
            .trim(),
    );
    let parts: Vec<&str> = cleaned.split('.').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err("malformed reference expression".to_string());
    }

    let root = parts[0];
    if BUILTIN_NAMESPACES.contains(&root) {
        return Ok(None);
    }

    let need = |count: usize| {
        if parts.len() < count {
            Err(format!("reference '{cleaned}' is missing its name"))
        } else {
            Ok(parts[..count].join("."))
        }
    };

    let target = match root {
        "var" => (need(2)?, RelationKind::References),
        "local" => (need(2)?, RelationKind::References),
        "output" => (need(2)?, RelationKind::References),
        "module" => (need(2)?, RelationKind::DependsOn),
        "data" => (need(3)?, RelationKind::DependsOn),
        _ => (need(2)?, RelationKind::DependsOn),
    };
    Ok(Some(target))
}

/// Removes `[..]` index segments, e.g. `aws_instance.web[0].id` becomes
/// `aws_instance.web.id`.
fn strip_indices(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut depth = 0usize;
    for c in expression.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, name: &str) -> SymbolRecord {
        SymbolRecord {
            file_path: "main.tf".to_string(),
            symbol_name: name.to_string(),
            symbol_kind: kind.to_string(),
            references: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn block_ids_follow_reference_syntax() {
        let cases = [
            ("resource", "aws_s3_bucket.logs", "aws_s3_bucket.logs", NodeKind::Resource),
            ("data", "aws_ami.ubuntu", "data.aws_ami.ubuntu", NodeKind::Data),
            ("data", "data.aws_ami.ubuntu", "data.aws_ami.ubuntu", NodeKind::Data),
            ("variable", "region", "var.region", NodeKind::Variable),
            ("output", "bucket_arn", "output.bucket_arn", NodeKind::Output),
            ("module", "vpc", "module.vpc", NodeKind::ModuleCall),
            ("locals", "tags", "local.tags", NodeKind::Local),
            ("provider", "aws", "provider.aws", NodeKind::Provider),
        ];
        for (kind, name, id, node_kind) in cases {
            assert_eq!(
                block_id(&record(kind, name)),
                Some((id.to_string(), node_kind)),
                "{kind} {name}"
            );
        }
        assert_eq!(block_id(&record("comment", "x")), None);
    }

    #[test]
    fn split_resource_labels_use_metadata_type() {
        let mut r = record("resource", "logs");
        r.metadata
            .insert("resource_type".to_string(), "aws_s3_bucket".into());
        assert_eq!(
            block_id(&r).map(|(id, _)| id),
            Some("aws_s3_bucket.logs".to_string())
        );
    }

    #[test]
    fn references_drop_attributes_and_indices() {
        assert_eq!(
            parse_reference("${aws_instance.web[0].id}"),
            Ok(Some(("aws_instance.web".to_string(), RelationKind::DependsOn)))
        );
        assert_eq!(
            parse_reference("var.region"),
            Ok(Some(("var.region".to_string(), RelationKind::References)))
        );
        assert_eq!(
            parse_reference("data.aws_ami.ubuntu.id"),
            Ok(Some(("data.aws_ami.ubuntu".to_string(), RelationKind::DependsOn)))
        );
        assert_eq!(
            parse_reference("module.vpc.subnet_ids"),
            Ok(Some(("module.vpc".to_string(), RelationKind::DependsOn)))
        );
    }

    #[test]
    fn builtin_namespaces_are_ignored_and_malformed_rejected() {
        assert_eq!(parse_reference("count.index"), Ok(None));
        assert_eq!(parse_reference("each.value"), Ok(None));
        assert!(parse_reference("var").is_err());
        assert!(parse_reference("data.aws_ami").is_err());
        assert!(parse_reference("a..b").is_err());
    }
}
