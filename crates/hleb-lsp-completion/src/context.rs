//! Completion context detection.
//!
//! Completion is only offered inside the string literal of a framework call
//! argument; the context records what that argument means and which part of
//! it has been typed.

use hleb_lsp_index::framework::{argument_roles, ArgumentRole};
use hleb_lsp_parser::calls::argument_at;
use hleb_lsp_parser::position::byte_column;
use hleb_lsp_types::{span_contains, FileSymbols, TextSpan};
use tree_sitter::Tree;

/// The context in which completion was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Inside a framework string argument.
    Literal {
        roles: Vec<ArgumentRole>,
        /// Literal contents before the cursor.
        typed: String,
        /// Range of the whole literal contents, replaced by the chosen item.
        replace: TextSpan,
    },

    /// No completion available.
    None,
}

/// Determine the completion context at a position.
pub fn detect_context(
    tree: &Tree,
    source: &str,
    line: u32,
    character: u32,
    file_symbols: &FileSymbols,
) -> CompletionContext {
    let Some(found) = argument_at(tree, source, file_symbols, line, character) else {
        return CompletionContext::None;
    };
    let Some(literal) = found.argument().string.as_ref() else {
        return CompletionContext::None;
    };
    let replace = literal.content_range;
    if !span_contains(replace, line, character) {
        return CompletionContext::None;
    }

    let roles = argument_roles(&found.call, found.index, true);
    if roles.is_empty() {
        return CompletionContext::None;
    }

    CompletionContext::Literal {
        roles,
        typed: typed_prefix(&literal.value, replace, line, character),
        replace,
    }
}

/// Part of a literal's contents that lies before the cursor.
fn typed_prefix(value: &str, replace: TextSpan, line: u32, character: u32) -> String {
    let (start_line, start_col, _, _) = replace;
    let mut offset = 0;
    for (i, text) in value.split('\n').enumerate() {
        let current = start_line + i as u32;
        if current == line {
            let col = if i == 0 {
                character.saturating_sub(start_col)
            } else {
                character
            };
            return value[..offset + byte_column(text, col)].to_string();
        }
        offset += text.len() + 1;
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hleb_lsp_parser::parser::FileParser;
    use hleb_lsp_parser::symbols::extract_file_symbols;
    use hleb_lsp_types::{PathMode, PathOptions};

    fn detect(code: &str, line: u32, col: u32) -> CompletionContext {
        let mut parser = FileParser::new();
        parser.parse_full(code);
        let tree = parser.tree().unwrap();
        let file_symbols = extract_file_symbols(tree, code);
        detect_context(tree, code, line, col, &file_symbols)
    }

    #[test]
    fn test_config_key_context() {
        let code = "<?php\nsetting('time');\n";
        match detect(code, 1, 11) {
            CompletionContext::Literal { roles, typed, replace } => {
                assert_eq!(
                    roles,
                    vec![ArgumentRole::ConfigKey {
                        config: "main".to_string()
                    }]
                );
                assert_eq!(typed, "ti");
                assert_eq!(replace, (1, 9, 1, 13));
            }
            other => panic!("Expected Literal, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_literal_context() {
        let code = "<?php\nview('');\n";
        match detect(code, 1, 6) {
            CompletionContext::Literal { roles, typed, .. } => {
                assert_eq!(roles[0], ArgumentRole::View);
                assert_eq!(
                    roles[1],
                    ArgumentRole::Path(PathOptions {
                        mode: PathMode::Files,
                        alias_only: true,
                    })
                );
                assert_eq!(typed, "");
            }
            other => panic!("Expected Literal, got {:?}", other),
        }
    }

    #[test]
    fn test_no_context_outside_literal() {
        assert_eq!(detect("<?php\nsetting('time');\n", 1, 3), CompletionContext::None);
        assert_eq!(detect("<?php\nstrlen('time');\n", 1, 9), CompletionContext::None);
        assert_eq!(detect("<?php\nsetting($time);\n", 1, 10), CompletionContext::None);
    }

    #[test]
    fn test_typed_prefix() {
        assert_eq!(typed_prefix("@views/index", (2, 10, 2, 22), 2, 16), "@views");
        assert_eq!(typed_prefix("ab\ncd", (0, 5, 1, 2), 1, 1), "ab\nc");
        assert_eq!(typed_prefix("abc", (0, 0, 0, 3), 0, 9), "abc");
        assert_eq!(typed_prefix("страница", (1, 6, 1, 14), 1, 9), "стр");
    }

    #[test]
    fn test_context_after_cyrillic_text() {
        let code = "<?php\n$t = 'Привет'; view('ind');\n";
        match detect(code, 1, 23) {
            CompletionContext::Literal { roles, typed, replace } => {
                assert_eq!(roles[0], ArgumentRole::View);
                assert_eq!(typed, "in");
                assert_eq!(replace, (1, 21, 1, 24));
            }
            other => panic!("Expected Literal, got {:?}", other),
        }
    }
}
