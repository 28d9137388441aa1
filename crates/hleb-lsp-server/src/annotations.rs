//! Framework annotations of one open document: hovers, definitions,
//! document links and diagnostics.
//!
//! Everything here is synchronous and reads the shared `FrameworkIndex`;
//! the server calls it while holding the document's parser.

use hleb_lsp_index::framework::{argument_roles, debug_hint, ArgumentRole, DebugHint};
use hleb_lsp_index::paths::PathTarget;
use hleb_lsp_index::FrameworkIndex;
use hleb_lsp_parser::calls::{argument_at, collect_call_sites, Argument};
use hleb_lsp_parser::literal::{check_string, strip_quotes};
use hleb_lsp_types::{FileSymbols, TextSpan, UNDEFINED_VALUE};
use std::path::PathBuf;
use tower_lsp::ls_types::{
    Diagnostic, DiagnosticSeverity, Hover, HoverContents, MarkupContent, MarkupKind, Position,
    Range,
};
use tree_sitter::Tree;

use crate::content;
use crate::settings::Settings;

/// Source name of framework diagnostics.
pub const DIAGNOSTIC_SOURCE: &str = "hleb-lsp";

const CONFIG_NOT_FOUND_MESSAGE: &str = "HLEB2: Configuration file not found";

/// One parsed document as the annotation functions see it.
pub struct Document<'a> {
    pub tree: &'a Tree,
    pub source: &'a str,
    pub symbols: &'a FileSymbols,
    /// Root-relative path, when the file is inside the project.
    pub file: Option<&'a str>,
}

/// Where a definition or link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    pub range: TextSpan,
}

pub fn span_to_range(span: TextSpan) -> Range {
    Range {
        start: Position::new(span.0, span.1),
        end: Position::new(span.2, span.3),
    }
}

/// Hover for the framework argument at `(line, col)`.
pub fn hover_at(
    doc: &Document,
    index: &FrameworkIndex,
    settings: &Settings,
    line: u32,
    col: u32,
) -> Option<Hover> {
    let found = argument_at(doc.tree, doc.source, doc.symbols, line, col)?;
    let argument = found.argument();
    let lang = settings.docs_language.as_str();

    let markdown = argument_roles(&found.call, found.index, false)
        .into_iter()
        .find_map(|role| role_hover(&role, argument, doc, index, lang))?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }),
        range: Some(span_to_range(argument.range)),
    })
}

fn role_hover(
    role: &ArgumentRole,
    argument: &Argument,
    doc: &Document,
    index: &FrameworkIndex,
    lang: &str,
) -> Option<String> {
    let value = strip_quotes(&argument.text);
    match role {
        ArgumentRole::ConfigName { key } => {
            let files = index.config_files(doc.file, value);
            if files.is_empty() {
                return Some(content::config_not_found(lang));
            }
            let key = key.as_deref().filter(|k| check_string(k));
            Some(content::config_name_hover(value, key, &files, lang))
        }
        ArgumentRole::ConfigKey { config } => {
            let (files, entries) = index.lookup_param(doc.file, config, value);
            Some(content::config_key_hover(value, &files, &entries, lang))
        }
        ArgumentRole::RequestParam(source) => Some(content::request_hover(*source, lang)),
        ArgumentRole::RouteAddress => {
            let route = match (doc.file, &argument.string) {
                (Some(file), Some(literal)) => {
                    let (line, col, _, _) = literal.content_range;
                    index.route_at(file, line, col)
                }
                _ => None,
            };
            Some(content::route_address_hover(route.as_ref(), lang))
        }
        ArgumentRole::RoutePrefix => Some(content::route_prefix_hover(lang)),
        ArgumentRole::RouteName => index
            .find_route_by_name(value)
            .map(|route| content::route_name_hover(&route, lang)),
        ArgumentRole::Path(_) | ArgumentRole::View => None,
    }
}

/// Definition of the framework argument at `(line, col)`.
pub fn definition_at(doc: &Document, index: &FrameworkIndex, line: u32, col: u32) -> Option<Target> {
    let found = argument_at(doc.tree, doc.source, doc.symbols, line, col)?;
    let argument = found.argument();
    argument_roles(&found.call, found.index, false)
        .into_iter()
        .find_map(|role| role_target(&role, argument, doc, index))
}

fn role_target(
    role: &ArgumentRole,
    argument: &Argument,
    doc: &Document,
    index: &FrameworkIndex,
) -> Option<Target> {
    let value = strip_quotes(&argument.text);
    match role {
        ArgumentRole::Path(_) | ArgumentRole::View => reference_target(role, value, doc, index),
        ArgumentRole::ConfigName { .. } => {
            let files = index.config_files(doc.file, value);
            let (file, _) = files.ordered().first().copied()?;
            project_target(index, file, (0, 0, 0, 0))
        }
        ArgumentRole::ConfigKey { config } => {
            let (_, entries) = index.lookup_param(doc.file, config, value);
            let entry = entries.iter().find(|e| e.value != UNDEFINED_VALUE)?;
            let range = index
                .config_text(&entry.file)
                .and_then(|text| key_position(&text, value))
                .unwrap_or((0, 0, 0, 0));
            project_target(index, &entry.file, range)
        }
        ArgumentRole::RouteName => {
            let route = index.find_route_by_name(value)?;
            project_target(index, &route.file, route.range)
        }
        ArgumentRole::RouteAddress => {
            let file = doc.file?;
            let (line, col, _, _) = argument.string.as_ref()?.content_range;
            let controller = index.route_at(file, line, col)?.controller?;
            let target = index.controller_file(&controller)?;
            project_target(index, &target, (0, 0, 0, 0))
        }
        ArgumentRole::RoutePrefix | ArgumentRole::RequestParam(_) => None,
    }
}

/// File a path or view argument names.
fn reference_target(role: &ArgumentRole, value: &str, doc: &Document, index: &FrameworkIndex) -> Option<Target> {
    match role {
        ArgumentRole::Path(options) => match index.resolve_path(value, *options)? {
            PathTarget::Project(rel) => project_target(index, &rel, (0, 0, 0, 0)),
            PathTarget::Absolute(path) => Some(Target {
                path,
                range: (0, 0, 0, 0),
            }),
        },
        ArgumentRole::View => {
            let rel = index.resolve_view(doc.file, value)?;
            project_target(index, &rel, (0, 0, 0, 0))
        }
        _ => None,
    }
}

fn project_target(index: &FrameworkIndex, rel: &str, range: TextSpan) -> Option<Target> {
    Some(Target {
        path: index.absolute_path(rel)?,
        range,
    })
}

/// Range of `'key'` on the line that declares it in a config file.
fn key_position(text: &str, key: &str) -> Option<TextSpan> {
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        for quote in ['\'', '"'] {
            let declares = trimmed
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_prefix(key))
                .and_then(|rest| rest.strip_prefix(quote))
                .is_some_and(|rest| rest.trim_start().starts_with("=>"));
            if declares {
                let indent = &line[..line.len() - trimmed.len()];
                let col = indent.encode_utf16().count() as u32;
                let end = col + key.encode_utf16().count() as u32 + 2;
                return Some((i as u32, col, i as u32, end));
            }
        }
    }
    None
}

/// Links for every path and view argument that resolves to a file.
pub fn document_links(doc: &Document, index: &FrameworkIndex) -> Vec<(TextSpan, Target)> {
    let mut links = Vec::new();
    for call in collect_call_sites(doc.tree, doc.source, doc.symbols) {
        for (i, argument) in call.arguments.iter().enumerate() {
            let Some(literal) = &argument.string else {
                continue;
            };
            let target = argument_roles(&call, i, false)
                .iter()
                .find_map(|role| reference_target(role, &literal.value, doc, index));
            if let Some(target) = target {
                links.push((literal.content_range, target));
            }
        }
    }
    links
}

/// Debug function hints and missing config files.
pub fn framework_diagnostics(doc: &Document, index: &FrameworkIndex, settings: &Settings) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for call in collect_call_sites(doc.tree, doc.source, doc.symbols) {
        for (i, argument) in call.arguments.iter().enumerate() {
            if settings.debug_hints {
                if let Some(hint) = debug_hint(&call, i) {
                    let severity = match hint {
                        DebugHint::Reminder => DiagnosticSeverity::HINT,
                        DebugHint::Info => DiagnosticSeverity::INFORMATION,
                    };
                    diagnostics.push(diagnostic(argument.range, severity, hint.message()));
                }
            }

            let missing_config = argument_roles(&call, i, false).iter().any(|role| {
                matches!(role, ArgumentRole::ConfigName { .. })
                    && index.config_files(doc.file, strip_quotes(&argument.text)).is_empty()
            });
            if missing_config {
                diagnostics.push(diagnostic(
                    argument.range,
                    DiagnosticSeverity::INFORMATION,
                    CONFIG_NOT_FOUND_MESSAGE,
                ));
            }
        }
    }
    diagnostics
}

fn diagnostic(span: TextSpan, severity: DiagnosticSeverity, message: &str) -> Diagnostic {
    Diagnostic {
        range: span_to_range(span),
        severity: Some(severity),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: message.to_string(),
        ..Default::default()
    }
}
