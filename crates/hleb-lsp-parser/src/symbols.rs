//! Extract namespace and imports from tree-sitter CST.
//!
//! Framework calls are recognised by the fully qualified name of the class
//! they go through (`Hleb\Static\Settings`, `Hleb\Static\Path`, ...), so every
//! written class name is resolved against the file's `namespace` and `use`
//! statements.

use hleb_lsp_types::*;
use tree_sitter::{Node, Tree};

/// Extract the namespace and use statements of a parsed PHP file.
pub fn extract_file_symbols(tree: &Tree, source: &str) -> FileSymbols {
    let mut result = FileSymbols::default();
    let root = tree.root_node();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "namespace_definition" => {
                if let Some(ns) = find_namespace_name(child, source) {
                    result.namespace = Some(ns);
                }
                // Braced namespace: imports live inside the body.
                if let Some(body) = child.child_by_field_name("body") {
                    let mut body_cursor = body.walk();
                    for stmt in body.children(&mut body_cursor) {
                        if stmt.kind() == "namespace_use_declaration" {
                            extract_use_statements(stmt, source, &mut result);
                        }
                    }
                }
            }
            "namespace_use_declaration" => {
                extract_use_statements(child, source, &mut result);
            }
            _ => {}
        }
    }

    result
}

/// The name is in a `namespace_name` child (not field "name").
fn find_namespace_name(node: Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "namespace_name" {
            return Some(node_text(child, source).to_string());
        }
    }
    None
}

fn extract_use_statements(node: Node, source: &str, result: &mut FileSymbols) {
    let kind = determine_use_kind(node, source);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "namespace_use_clause" {
            extract_single_use_clause(child, source, result, kind);
        } else if child.kind() == "namespace_use_group" {
            extract_use_group(child, node, source, result, kind);
        }
    }
}

/// namespace_use_clause -> qualified_name, [as, name(alias)]
fn clause_parts(clause: Node, source: &str) -> Option<(String, Option<String>)> {
    let mut fqn: Option<String> = None;
    let mut alias: Option<String> = None;
    let mut saw_as = false;

    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "qualified_name" | "namespace_name" | "name" if !saw_as => {
                fqn = Some(node_text(child, source).trim_start_matches('\\').to_string());
            }
            "as" => {
                saw_as = true;
            }
            "name" if saw_as => {
                alias = Some(node_text(child, source).to_string());
            }
            _ => {}
        }
    }

    fqn.map(|fqn| (fqn, alias))
}

fn extract_single_use_clause(clause: Node, source: &str, result: &mut FileSymbols, kind: UseKind) {
    if let Some((fqn, alias)) = clause_parts(clause, source) {
        result.use_statements.push(UseStatement { fqn, alias, kind });
    }
}

fn extract_use_group(
    group: Node,
    parent: Node,
    source: &str,
    result: &mut FileSymbols,
    kind: UseKind,
) {
    let prefix = parent
        .child_by_field_name("prefix")
        .map(|n| node_text(n, source).trim_start_matches('\\').to_string())
        .unwrap_or_default();

    let mut cursor = group.walk();
    for child in group.children(&mut cursor) {
        if !child.kind().starts_with("namespace_use") || child.kind() == "namespace_use_group" {
            continue;
        }
        let Some((name, alias)) = clause_parts(child, source) else {
            continue;
        };
        let fqn = if prefix.is_empty() {
            name
        } else {
            format!("{}\\{}", prefix, name)
        };
        result.use_statements.push(UseStatement { fqn, alias, kind });
    }
}

fn determine_use_kind(node: Node, source: &str) -> UseKind {
    let text = node_text(node, source);
    if text.starts_with("use function ") || text.starts_with("use function\t") {
        return UseKind::Function;
    }
    if text.starts_with("use const ") || text.starts_with("use const\t") {
        return UseKind::Constant;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            match child.kind() {
                "function" => return UseKind::Function,
                "const" => return UseKind::Constant,
                "namespace_use_clause" | "namespace_use_group" => break,
                _ => {}
            }
        }
    }
    UseKind::Class
}

/// Resolve a written class name using use statements and current namespace.
///
/// `\Foo\Bar` is already fully qualified; `self`, `static` and `parent` are
/// returned unchanged.
pub fn resolve_class_name(name: &str, file_symbols: &FileSymbols) -> String {
    if let Some(stripped) = name.strip_prefix('\\') {
        return stripped.to_string();
    }

    if matches!(name, "self" | "static" | "parent") {
        return name.to_string();
    }

    let parts: Vec<&str> = name.split('\\').collect();
    let first_part = parts[0];

    for use_stmt in &file_symbols.use_statements {
        if use_stmt.kind != UseKind::Class {
            continue;
        }
        let alias = use_stmt
            .alias
            .as_deref()
            .unwrap_or_else(|| use_stmt.fqn.rsplit('\\').next().unwrap_or(&use_stmt.fqn));

        if alias.eq_ignore_ascii_case(first_part) {
            if parts.len() == 1 {
                return use_stmt.fqn.clone();
            }
            // use App\Foo; then Foo\Bar -> App\Foo\Bar
            return format!("{}\\{}", use_stmt.fqn, parts[1..].join("\\"));
        }
    }

    match &file_symbols.namespace {
        Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, name),
        _ => name.to_string(),
    }
}

/// Whether a written class name was brought in by an import, as opposed to
/// falling back to the current namespace.
pub fn is_imported(name: &str, file_symbols: &FileSymbols) -> bool {
    let first = name.split('\\').next().unwrap_or(name);
    file_symbols.use_statements.iter().any(|u| {
        u.kind == UseKind::Class
            && u.alias
                .as_deref()
                .unwrap_or_else(|| u.fqn.rsplit('\\').next().unwrap_or(&u.fqn))
                .eq_ignore_ascii_case(first)
    })
}

pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FileParser;

    fn parse_and_extract(code: &str) -> FileSymbols {
        let parser = FileParser::from_source(code);
        extract_file_symbols(parser.tree().unwrap(), code)
    }

    #[test]
    fn test_extract_namespace() {
        let syms = parse_and_extract("<?php\nnamespace App\\Controllers;\nclass Foo {}\n");
        assert_eq!(syms.namespace.as_deref(), Some("App\\Controllers"));
        assert!(syms.use_statements.is_empty());
    }

    #[test]
    fn test_extract_use_statements() {
        let syms = parse_and_extract(
            "<?php\nuse Hleb\\Static\\Settings;\nuse Hleb\\Static\\Path as P;\nuse function App\\helper;\n",
        );
        assert_eq!(syms.use_statements.len(), 3);
        assert_eq!(syms.use_statements[0].fqn, "Hleb\\Static\\Settings");
        assert_eq!(syms.use_statements[0].alias, None);
        assert_eq!(syms.use_statements[0].kind, UseKind::Class);

        assert_eq!(syms.use_statements[1].fqn, "Hleb\\Static\\Path");
        assert_eq!(syms.use_statements[1].alias.as_deref(), Some("P"));

        assert_eq!(syms.use_statements[2].fqn, "App\\helper");
        assert_eq!(syms.use_statements[2].kind, UseKind::Function);
    }

    #[test]
    fn test_extract_group_use() {
        let syms = parse_and_extract("<?php\nuse Hleb\\Static\\{Request, Settings as S};\n");
        let fqns: Vec<_> = syms.use_statements.iter().map(|u| u.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["Hleb\\Static\\Request", "Hleb\\Static\\Settings"]);
        assert_eq!(syms.use_statements[1].alias.as_deref(), Some("S"));
    }

    #[test]
    fn test_extract_braced_namespace_imports() {
        let syms = parse_and_extract(
            "<?php\nnamespace App {\n    use Hleb\\Static\\Request;\n}\n",
        );
        assert_eq!(syms.namespace.as_deref(), Some("App"));
        assert_eq!(syms.use_statements.len(), 1);
    }

    #[test]
    fn test_resolve_class_name() {
        let syms = parse_and_extract(
            "<?php\nnamespace App\\Controllers;\nuse Hleb\\Static\\Settings;\nuse Hleb\\Reference as Ref;\n",
        );
        assert_eq!(resolve_class_name("Settings", &syms), "Hleb\\Static\\Settings");
        assert_eq!(resolve_class_name("settings", &syms), "Hleb\\Static\\Settings");
        assert_eq!(
            resolve_class_name("Ref\\RequestInterface", &syms),
            "Hleb\\Reference\\RequestInterface"
        );
        assert_eq!(resolve_class_name("\\Route", &syms), "Route");
        assert_eq!(resolve_class_name("Local", &syms), "App\\Controllers\\Local");
        assert_eq!(resolve_class_name("self", &syms), "self");
    }

    #[test]
    fn test_resolve_without_namespace() {
        let syms = parse_and_extract("<?php\nRoute::get('/');\n");
        assert_eq!(resolve_class_name("Route", &syms), "Route");
        assert!(!is_imported("Route", &syms));
    }

    #[test]
    fn test_is_imported() {
        let syms = parse_and_extract("<?php\nnamespace App;\nuse Hleb\\Static\\Path;\n");
        assert!(is_imported("Path", &syms));
        assert!(!is_imported("Request", &syms));
    }
}
