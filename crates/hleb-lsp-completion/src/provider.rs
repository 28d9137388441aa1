//! Completion item providers.
//!
//! Given a completion context and the framework index, provides the values
//! an argument can take. Every item replaces the whole literal contents.

use crate::context::CompletionContext;
use hleb_lsp_index::framework::ArgumentRole;
use hleb_lsp_index::paths::split_alias;
use hleb_lsp_index::tree::join;
use hleb_lsp_index::FrameworkIndex;
use hleb_lsp_types::TextSpan;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, CompletionTextEdit, Position,
    Range, TextEdit,
};

/// Provide completion items based on context.
///
/// `current_file` is the root-relative path of the edited file; `limit` caps
/// path and view variants.
pub fn provide_completions(
    context: &CompletionContext,
    index: &FrameworkIndex,
    current_file: Option<&str>,
    limit: usize,
) -> Vec<CompletionItem> {
    let CompletionContext::Literal {
        roles,
        typed,
        replace,
    } = context
    else {
        return Vec::new();
    };

    let mut items: Vec<CompletionItem> = Vec::new();
    for role in roles {
        let provided = match role {
            ArgumentRole::Path(options) => {
                if options.alias_only && !typed.starts_with('@') {
                    continue;
                }
                provide_path_completions(index, typed, *options, limit, *replace)
            }
            ArgumentRole::View => {
                if typed.starts_with('@') {
                    continue;
                }
                provide_view_completions(index, current_file, limit, *replace)
            }
            ArgumentRole::ConfigName { .. } => provide_config_name_completions(index, *replace),
            ArgumentRole::ConfigKey { config } => {
                provide_config_key_completions(index, current_file, config, *replace)
            }
            ArgumentRole::RouteName => provide_route_name_completions(index, *replace),
            ArgumentRole::RouteAddress | ArgumentRole::RoutePrefix | ArgumentRole::RequestParam(_) => {
                Vec::new()
            }
        };
        for item in provided {
            if !items.iter().any(|i| i.label == item.label) {
                items.push(item);
            }
        }
    }
    tracing::debug!("{} completion items for {:?}", items.len(), typed);
    items
}

fn provide_path_completions(
    index: &FrameworkIndex,
    typed: &str,
    options: hleb_lsp_types::PathOptions,
    limit: usize,
    replace: TextSpan,
) -> Vec<CompletionItem> {
    index
        .path_variants(typed, options, limit)
        .into_iter()
        .map(|variant| {
            let is_dir = split_alias(&variant)
                .is_some_and(|(alias, rest)| index.tree.is_dir(&join(alias.base_dir(), rest)));
            let kind = if is_dir {
                CompletionItemKind::FOLDER
            } else {
                CompletionItemKind::FILE
            };
            literal_item(variant, kind, None, replace)
        })
        .collect()
}

fn provide_view_completions(
    index: &FrameworkIndex,
    current_file: Option<&str>,
    limit: usize,
    replace: TextSpan,
) -> Vec<CompletionItem> {
    index
        .view_variants(current_file, limit)
        .into_iter()
        .map(|variant| {
            let mut item = literal_item(
                variant.label,
                CompletionItemKind::FILE,
                Some(variant.detail),
                replace,
            );
            if !variant.extension.is_empty() {
                item.label_details = Some(CompletionItemLabelDetails {
                    detail: None,
                    description: Some(variant.extension),
                });
            }
            item
        })
        .collect()
}

fn provide_config_name_completions(index: &FrameworkIndex, replace: TextSpan) -> Vec<CompletionItem> {
    index
        .config_names()
        .into_iter()
        .map(|name| {
            literal_item(
                name,
                CompletionItemKind::MODULE,
                Some("Configuration file type".to_string()),
                replace,
            )
        })
        .collect()
}

fn provide_config_key_completions(
    index: &FrameworkIndex,
    current_file: Option<&str>,
    config: &str,
    replace: TextSpan,
) -> Vec<CompletionItem> {
    index
        .config_keys(current_file, config)
        .into_iter()
        .map(|key| {
            literal_item(
                key,
                CompletionItemKind::PROPERTY,
                Some(format!("Configuration parameter ({})", config)),
                replace,
            )
        })
        .collect()
}

fn provide_route_name_completions(index: &FrameworkIndex, replace: TextSpan) -> Vec<CompletionItem> {
    index
        .all_routes()
        .into_iter()
        .filter_map(|route| {
            let name = route.name?;
            Some(literal_item(
                name,
                CompletionItemKind::REFERENCE,
                Some(format!("{} {}", route.methods.join("|"), route.full_address)),
                replace,
            ))
        })
        .fold(Vec::new(), |mut items: Vec<CompletionItem>, item| {
            if !items.iter().any(|i| i.label == item.label) {
                items.push(item);
            }
            items
        })
}

fn literal_item(
    label: String,
    kind: CompletionItemKind,
    detail: Option<String>,
    replace: TextSpan,
) -> CompletionItem {
    CompletionItem {
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: span_to_range(replace),
            new_text: label.clone(),
        })),
        filter_text: Some(label.clone()),
        label,
        kind: Some(kind),
        detail,
        ..Default::default()
    }
}

fn span_to_range(span: TextSpan) -> Range {
    Range {
        start: Position {
            line: span.0,
            character: span.1,
        },
        end: Position {
            line: span.2,
            character: span.3,
        },
    }
}
