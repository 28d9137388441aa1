//! Conversion between tree-sitter byte columns and LSP positions.
//!
//! tree-sitter reports columns in bytes; LSP clients count UTF-16 code units.
//! Everything this crate hands out (`TextSpan`s, diagnostics) is in LSP units.

use hleb_lsp_types::TextSpan;
use tree_sitter::{Node, Point};

/// UTF-16 column of `byte` on a line that starts at `byte - column`.
fn utf16_column(source: &str, byte: usize, column: usize) -> u32 {
    let line_start = byte.saturating_sub(column);
    match source.get(line_start..byte) {
        Some(prefix) => prefix.encode_utf16().count() as u32,
        None => column as u32,
    }
}

/// LSP `(line, character)` of a tree-sitter point at `byte`.
pub fn lsp_position(source: &str, byte: usize, point: Point) -> (u32, u32) {
    (point.row as u32, utf16_column(source, byte, point.column))
}

/// Range of a node in LSP coordinates.
pub fn node_span(node: Node, source: &str) -> TextSpan {
    let (start_line, start_col) = lsp_position(source, node.start_byte(), node.start_position());
    let (end_line, end_col) = lsp_position(source, node.end_byte(), node.end_position());
    (start_line, start_col, end_line, end_col)
}

/// Byte column for a UTF-16 `character` on `line`, clamped to the line.
pub fn byte_column(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= character || ch == '\n' {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}

/// tree-sitter point for an LSP position in `source`.
pub fn point_at(source: &str, line: u32, character: u32) -> Point {
    let column = source
        .split('\n')
        .nth(line as usize)
        .map(|text| byte_column(text, character))
        .unwrap_or(0);
    Point::new(line as usize, column)
}
