//! Extract diagnostics (syntax errors) from tree-sitter CST.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};
use tree_sitter::Node;

use crate::position::node_span;

/// Upper bound on reported syntax errors per file; one bad brace can
/// otherwise flood the editor.
const MAX_SYNTAX_ERRORS: usize = 50;

/// Extract syntax error diagnostics from a tree-sitter tree.
pub fn extract_syntax_errors(tree: &tree_sitter::Tree, source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if tree.root_node().has_error() {
        collect_errors(tree.root_node(), source, &mut diagnostics);
    }
    diagnostics
}

fn collect_errors(node: Node, source: &str, diagnostics: &mut Vec<Diagnostic>) {
    if diagnostics.len() >= MAX_SYNTAX_ERRORS {
        return;
    }

    if node.is_error() {
        diagnostics.push(make_diagnostic(node, source, "Syntax error".to_string()));
        // Children of an ERROR node are part of the same mistake.
        return;
    }
    if node.is_missing() {
        diagnostics.push(make_diagnostic(node, source, format!("Missing {}", node.kind())));
        return;
    }

    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, source, diagnostics);
    }
}

fn make_diagnostic(node: Node, source: &str, message: String) -> Diagnostic {
    let (start_line, start_col, end_line, end_col) = node_span(node, source);
    Diagnostic {
        range: Range {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        },
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("hleb-lsp".to_string()),
        message,
        ..Default::default()
    }
}
