//! FileParser: tree-sitter + ropey::Rope for incremental PHP parsing.

use ropey::Rope;
use tree_sitter::{InputEdit, Parser, Point, Tree};

/// Manages parsing state for a single PHP file.
pub struct FileParser {
    parser: Parser,
    tree: Option<Tree>,
    rope: Rope,
}

impl FileParser {
    /// Create a new FileParser with tree-sitter-php language.
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .expect("Failed to set tree-sitter PHP language");

        FileParser {
            parser,
            tree: None,
            rope: Rope::new(),
        }
    }

    /// Parse a file that is not open in the editor (route files, indexing).
    pub fn from_source(source: &str) -> Self {
        let mut parser = Self::new();
        parser.parse_full(source);
        parser
    }

    /// Full parse of a source string (used on didOpen).
    pub fn parse_full(&mut self, source: &str) {
        self.rope = Rope::from_str(source);
        self.tree = self.parser.parse(source.as_bytes(), None);
        if self.tree.is_none() {
            tracing::warn!("tree-sitter produced no tree ({} bytes)", source.len());
        }
    }

    /// Apply an incremental edit from LSP didChange and reparse.
    ///
    /// `range` is (start_line, start_char, end_line, end_char) in 0-based LSP
    /// coordinates; columns count UTF-16 code units.
    pub fn apply_edit(
        &mut self,
        start_line: u32,
        start_char: u32,
        end_line: u32,
        end_char: u32,
        new_text: &str,
    ) {
        let start_line = start_line as usize;
        let start_char = start_char as usize;
        let end_line = end_line as usize;
        let end_char = end_char as usize;

        let start_byte = self.position_to_byte(start_line, start_char);
        let old_end_byte = self.position_to_byte(end_line, end_char).max(start_byte);

        let start_point = self.byte_to_point(start_byte);
        let old_end_point = self.byte_to_point(old_end_byte);

        let start_char_idx = self.rope.byte_to_char(start_byte);
        let end_char_idx = self.rope.byte_to_char(old_end_byte);
        self.rope.remove(start_char_idx..end_char_idx);
        self.rope.insert(start_char_idx, new_text);

        let new_end_byte = start_byte + new_text.len();
        let new_end_point = self.byte_to_point(new_end_byte);

        if let Some(tree) = &mut self.tree {
            tree.edit(&InputEdit {
                start_byte,
                old_end_byte,
                new_end_byte,
                start_position: start_point,
                old_end_position: old_end_point,
                new_end_position: new_end_point,
            });
        }

        let source = self.rope.to_string();
        self.tree = self.parser.parse(source.as_bytes(), self.tree.as_ref());
    }

    /// Get the current tree-sitter Tree (if parsed successfully).
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Get the current source as a String.
    pub fn source(&self) -> String {
        self.rope.to_string()
    }

    /// Get the current rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Convert an LSP (line, UTF-16 column) to a byte offset, clamped to the line.
    fn position_to_byte(&self, line: usize, character: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        let text = self.rope.line(line);
        let units = character.min(text.len_utf16_cu());
        let char_idx = self.rope.line_to_char(line) + text.utf16_cu_to_char(units);
        self.rope.char_to_byte(char_idx)
    }

    fn byte_to_point(&self, byte: usize) -> Point {
        let byte = byte.min(self.rope.len_bytes());
        let line = self.rope.byte_to_line(byte);
        let line_start = self.rope.line_to_byte(line);
        Point::new(line, byte - line_start)
    }
}

impl Default for FileParser {
    fn default() -> Self {
        Self::new()
    }
}
