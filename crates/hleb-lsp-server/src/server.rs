//! LSP server implementation: the LanguageServer trait for HLEB2 projects.

use dashmap::DashMap;
use hleb_lsp_completion::context::{detect_context, CompletionContext};
use hleb_lsp_completion::provider::provide_completions;
use hleb_lsp_index::config::is_config_path;
use hleb_lsp_index::routes::is_route_file;
use hleb_lsp_index::{FileChange, FrameworkIndex};
use hleb_lsp_parser::diagnostics::extract_syntax_errors;
use hleb_lsp_parser::parser::FileParser;
use hleb_lsp_parser::symbols::extract_file_symbols;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::ls_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::annotations::{self, span_to_range, Document, DIAGNOSTIC_SOURCE};
use crate::settings::Settings;

const WATCHER_REGISTRATION_ID: &str = "hleb-lsp-file-watcher";
const MAX_WORKSPACE_SYMBOLS: usize = 200;
const COMPOSER_FILE: &str = "composer.json";

/// Main LSP backend holding all state.
pub struct HlebLspBackend {
    /// Client handle for notifications and server-initiated requests.
    client: Client,
    /// Open document parsers (URI string → FileParser).
    open_files: Arc<DashMap<String, FileParser>>,
    /// Framework model of the workspace.
    index: Arc<FrameworkIndex>,
    /// Workspace root path (set during initialize).
    workspace_root: Mutex<Option<PathBuf>>,
    settings: Mutex<Settings>,
    /// Trace level from InitializeParams (off/messages/verbose).
    trace_level: Mutex<TraceValue>,
    /// Client accepts `window/workDoneProgress/create`.
    progress_supported: AtomicBool,
    /// Client accepts dynamic `workspace/didChangeWatchedFiles` registration.
    watch_supported: AtomicBool,
}

impl HlebLspBackend {
    pub fn new(client: Client) -> Self {
        HlebLspBackend {
            client,
            open_files: Arc::new(DashMap::new()),
            index: Arc::new(FrameworkIndex::new()),
            workspace_root: Mutex::new(None),
            settings: Mutex::new(Settings::default()),
            trace_level: Mutex::new(TraceValue::Off),
            progress_supported: AtomicBool::new(false),
            watch_supported: AtomicBool::new(false),
        }
    }

    /// Log a message to the client if trace level is verbose.
    async fn log_trace(&self, message: &str) {
        let level = *self.trace_level.lock().await;
        if level == TraceValue::Verbose {
            tracing::trace!("{}", message);
            self.client.log_message(MessageType::LOG, message).await;
        }
    }

    /// Root-relative path of a document, when it lies inside the workspace.
    fn relative_file(&self, uri_str: &str) -> Option<String> {
        let path = uri_to_path(uri_str)?;
        self.index.relative_path(&path).ok()
    }

    fn framework_enabled(&self, settings: &Settings) -> bool {
        settings.force_enable || self.index.is_framework_project()
    }

    /// Run `f` over an open document. The DashMap guard is released before
    /// this returns.
    fn with_document<T>(
        &self,
        uri_str: &str,
        rel: Option<&str>,
        f: impl FnOnce(&Document) -> Option<T>,
    ) -> Option<T> {
        let parser = self.open_files.get(uri_str)?;
        let tree = parser.tree()?;
        let source = parser.source();
        let symbols = extract_file_symbols(tree, &source);
        let doc = Document {
            tree,
            source: &source,
            symbols: &symbols,
            file: rel,
        };
        f(&doc)
    }

    /// Publish diagnostics for a file.
    async fn publish_diagnostics(&self, uri: &Uri) {
        let uri_str = uri.as_str().to_string();
        let settings = self.settings.lock().await.clone();
        let enabled = self.framework_enabled(&settings);
        let rel = self.relative_file(&uri_str);

        let diagnostics = {
            if let Some(parser) = self.open_files.get(&uri_str) {
                compute_diagnostics(&parser, &self.index, &settings, rel.as_deref(), enabled)
            } else {
                vec![]
            }
        };

        self.client
            .publish_diagnostics(uri.clone(), diagnostics, None)
            .await;
    }

    /// Diagnostics of every open file depend on the config and route data.
    async fn republish_all(&self) {
        let uris: Vec<String> = self.open_files.iter().map(|e| e.key().clone()).collect();
        for uri_str in uris {
            if let Ok(uri) = uri_str.parse::<Uri>() {
                self.publish_diagnostics(&uri).await;
            }
        }
    }

    async fn register_file_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*".to_string()),
                kind: None,
            }],
        };
        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.register_capability(vec![registration]).await {
                tracing::warn!("File watcher registration failed: {}", e);
            }
        });
    }

    /// Scan the workspace and build the framework model.
    async fn load_workspace(&self, root: PathBuf) {
        let progress_token = ProgressToken::String("hleb-lsp-indexing".to_string());
        let progress_supported = self.progress_supported.load(Ordering::Relaxed)
            && self
                .client
                .create_work_done_progress(progress_token.clone())
                .await
                .is_ok();

        let ongoing = if progress_supported {
            let progress = self
                .client
                .progress(progress_token, "Indexing HLEB2 project")
                .with_percentage(0)
                .with_message("Scanning files...");
            Some(progress.begin().await)
        } else {
            None
        };

        let index = self.index.clone();
        let scan_root = root.clone();
        let result = tokio::task::spawn_blocking(move || index.load(&scan_root)).await;

        let message = match result {
            Ok(Ok(summary)) => {
                tracing::info!(
                    "Indexed {}: {} entries, {} config files, {} routes in {} files",
                    root.display(),
                    summary.entries,
                    summary.config_documents,
                    summary.routes,
                    summary.route_files
                );
                format!(
                    "hleb-lsp: indexed {} config files and {} routes",
                    summary.config_documents, summary.routes
                )
            }
            Ok(Err(e)) => {
                tracing::warn!("Workspace indexing failed: {}", e);
                format!("hleb-lsp: indexing failed: {}", e)
            }
            Err(e) => {
                tracing::error!("Workspace indexing task failed: {}", e);
                format!("hleb-lsp: indexing failed: {}", e)
            }
        };

        if let Some(p) = ongoing {
            p.finish_with_message(message.clone()).await;
        }
        self.client.log_message(MessageType::INFO, message).await;

        if !self.index.is_framework_project() {
            tracing::info!("No HLEB2 project detected, framework features are off");
        }
    }
}

fn compute_diagnostics(
    parser: &FileParser,
    index: &FrameworkIndex,
    settings: &Settings,
    rel: Option<&str>,
    framework_enabled: bool,
) -> Vec<Diagnostic> {
    let tree = match parser.tree() {
        Some(t) => t,
        None => return vec![],
    };
    let source = parser.source();

    // Syntax errors (ERROR / MISSING nodes)
    let mut diagnostics: Vec<Diagnostic> = extract_syntax_errors(tree, &source)
        .into_iter()
        .map(|d| Diagnostic {
            range: lsp_range_to_ls(d.range),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: d.message,
            ..Default::default()
        })
        .collect();

    if framework_enabled {
        let symbols = extract_file_symbols(tree, &source);
        let doc = Document {
            tree,
            source: &source,
            symbols: &symbols,
            file: rel,
        };
        diagnostics.extend(annotations::framework_diagnostics(&doc, index, settings));
    }

    diagnostics
}

/// Files whose content the framework model is built from.
fn feeds_index(rel: &str) -> bool {
    is_config_path(rel) || is_route_file(rel) || rel == COMPOSER_FILE
}

/// Convert a file:// URI to a filesystem path.
fn uri_to_path(uri: &str) -> Option<PathBuf> {
    if !uri.starts_with("file:") {
        return None;
    }
    let uri: Uri = uri.parse().ok()?;
    uri.to_file_path().map(Cow::into_owned)
}

/// Convert a file path to a percent-encoded file:// URI.
fn path_to_uri(path: &Path) -> Option<Uri> {
    Uri::from_file_path(path)
}

fn lsp_range_to_ls(range: lsp_types::Range) -> Range {
    Range {
        start: Position::new(range.start.line, range.start.character),
        end: Position::new(range.end.line, range.end.character),
    }
}

/// Convert lsp_types::CompletionItemKind to ls_types::CompletionItemKind.
fn lsp_completion_kind_to_ls(kind: lsp_types::CompletionItemKind) -> CompletionItemKind {
    match kind {
        lsp_types::CompletionItemKind::MODULE => CompletionItemKind::MODULE,
        lsp_types::CompletionItemKind::PROPERTY => CompletionItemKind::PROPERTY,
        lsp_types::CompletionItemKind::VALUE => CompletionItemKind::VALUE,
        lsp_types::CompletionItemKind::FILE => CompletionItemKind::FILE,
        lsp_types::CompletionItemKind::REFERENCE => CompletionItemKind::REFERENCE,
        lsp_types::CompletionItemKind::FOLDER => CompletionItemKind::FOLDER,
        _ => CompletionItemKind::TEXT,
    }
}

/// Convert an lsp_types completion item to the ls_types one the client gets.
fn lsp_completion_item_to_ls(item: lsp_types::CompletionItem) -> CompletionItem {
    let text_edit = item.text_edit.and_then(|edit| match edit {
        lsp_types::CompletionTextEdit::Edit(edit) => Some(CompletionTextEdit::Edit(TextEdit {
            range: lsp_range_to_ls(edit.range),
            new_text: edit.new_text,
        })),
        lsp_types::CompletionTextEdit::InsertAndReplace(_) => None,
    });
    let label_details = item.label_details.map(|d| CompletionItemLabelDetails {
        detail: d.detail,
        description: d.description,
    });

    CompletionItem {
        label: item.label,
        kind: item.kind.map(lsp_completion_kind_to_ls),
        detail: item.detail,
        label_details,
        filter_text: item.filter_text,
        text_edit,
        ..Default::default()
    }
}

fn file_change_from_ls(typ: FileChangeType) -> Option<FileChange> {
    match typ {
        FileChangeType::CREATED => Some(FileChange::Created),
        FileChangeType::CHANGED => Some(FileChange::Changed),
        FileChangeType::DELETED => Some(FileChange::Deleted),
        _ => None,
    }
}

impl LanguageServer for HlebLspBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("hleb-lsp: initialize");

        // Store trace level from client
        if let Some(trace) = params.trace {
            *self.trace_level.lock().await = trace;
            tracing::info!("Trace level: {:?}", trace);
        }

        // Extract workspace root from InitializeParams
        #[allow(deprecated)]
        let root_path = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri_to_path(uri.as_str()))
            .or_else(|| params.root_path.as_ref().map(PathBuf::from));

        if let Some(ref opts) = params.initialization_options {
            let settings = Settings::from_value(opts);
            tracing::info!("Settings: {:?}", settings);
            *self.settings.lock().await = settings;
        }

        if let Some(ref root) = root_path {
            tracing::info!("Workspace root: {}", root.display());
            *self.workspace_root.lock().await = Some(root.clone());
        }

        let capabilities = &params.capabilities;
        let progress = capabilities
            .window
            .as_ref()
            .and_then(|w| w.work_done_progress)
            .unwrap_or(false);
        let watch = capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.did_change_watched_files.as_ref())
            .and_then(|d| d.dynamic_registration)
            .unwrap_or(false);
        self.progress_supported.store(progress, Ordering::Relaxed);
        self.watch_supported.store(watch, Ordering::Relaxed);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..Default::default()
                    },
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        "'".to_string(),
                        "\"".to_string(),
                        "/".to_string(),
                        "@".to_string(),
                    ]),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "hleb-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("hleb-lsp: initialized");
        self.client
            .log_message(MessageType::INFO, "hleb-lsp server initialized")
            .await;

        let workspace_root = self.workspace_root.lock().await.clone();
        let Some(root) = workspace_root else {
            tracing::warn!("No workspace root, skipping indexing");
            return;
        };

        self.load_workspace(root).await;

        if self.watch_supported.load(Ordering::Relaxed) {
            self.register_file_watcher().await;
        }

        // Open files were checked before the model existed.
        self.republish_all().await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("hleb-lsp: shutdown");
        Ok(())
    }

    // --- Document Synchronization ---

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let uri_str = uri.as_str().to_string();
        let text = &params.text_document.text;

        tracing::debug!("didOpen: {}", uri_str);
        self.log_trace(&format!("didOpen: {}", uri_str)).await;

        let mut parser = FileParser::new();
        parser.parse_full(text);
        self.open_files.insert(uri_str.clone(), parser);

        match self.relative_file(&uri_str) {
            Some(rel) if is_config_path(&rel) || is_route_file(&rel) => {
                self.index.update_buffer(&rel, text);
                self.log_trace(&format!("Indexed buffer of {}", rel)).await;
                self.republish_all().await;
            }
            _ => self.publish_diagnostics(&uri).await,
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let uri_str = uri.as_str().to_string();

        tracing::debug!("didChange: {}", uri_str);

        let source = if let Some(mut parser) = self.open_files.get_mut(&uri_str) {
            for change in &params.content_changes {
                if let Some(range) = change.range {
                    parser.apply_edit(
                        range.start.line,
                        range.start.character,
                        range.end.line,
                        range.end.character,
                        &change.text,
                    );
                } else {
                    // Full content replacement
                    parser.parse_full(&change.text);
                }
            }
            Some(parser.source())
        } else {
            None
        };

        match (self.relative_file(&uri_str), source) {
            (Some(rel), Some(source)) if is_config_path(&rel) || is_route_file(&rel) => {
                self.index.update_buffer(&rel, &source);
                self.republish_all().await;
            }
            _ => self.publish_diagnostics(&uri).await,
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let uri_str = uri.as_str().to_string();
        tracing::debug!("didClose: {}", uri_str);
        self.open_files.remove(&uri_str);
        // Clear diagnostics for closed file
        self.client.publish_diagnostics(uri, vec![], None).await;

        if let Some(rel) = self.relative_file(&uri_str) {
            self.index.close_buffer(&rel);
            if feeds_index(&rel) {
                self.republish_all().await;
            }
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri_str = params.text_document.uri.as_str();
        tracing::debug!("didSave: {}", uri_str);
        if let Some(rel) = self.relative_file(uri_str) {
            self.index.reload_from_disk(&rel);
            if feeds_index(&rel) {
                self.republish_all().await;
            }
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = Settings::from_value(&params.settings);
        tracing::info!("Settings changed: {:?}", settings);
        *self.settings.lock().await = settings;
        self.republish_all().await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for event in params.changes {
            let Some(change) = file_change_from_ls(event.typ) else {
                continue;
            };
            let Some(path) = uri_to_path(event.uri.as_str()) else {
                continue;
            };
            if let Err(e) = self.index.apply_change(&path, change) {
                tracing::debug!("Ignoring {:?} of {}: {}", change, path.display(), e);
            }
        }
        self.republish_all().await;
    }

    // --- Language Features ---

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri_str = params
            .text_document_position_params
            .text_document
            .uri
            .as_str()
            .to_string();
        let pos = params.text_document_position_params.position;
        tracing::debug!("hover: {}:{}:{}", uri_str, pos.line, pos.character);

        let settings = self.settings.lock().await.clone();
        if !self.framework_enabled(&settings) {
            return Ok(None);
        }
        let rel = self.relative_file(&uri_str);

        Ok(self.with_document(&uri_str, rel.as_deref(), |doc| {
            annotations::hover_at(doc, &self.index, &settings, pos.line, pos.character)
        }))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri_str = params
            .text_document_position_params
            .text_document
            .uri
            .as_str()
            .to_string();
        let pos = params.text_document_position_params.position;
        tracing::debug!("gotoDefinition: {}:{}:{}", uri_str, pos.line, pos.character);

        let settings = self.settings.lock().await.clone();
        if !self.framework_enabled(&settings) {
            return Ok(None);
        }
        let rel = self.relative_file(&uri_str);

        let target = self.with_document(&uri_str, rel.as_deref(), |doc| {
            annotations::definition_at(doc, &self.index, pos.line, pos.character)
        });

        let result = target.and_then(|target| {
            let uri = path_to_uri(&target.path)?;
            Some(GotoDefinitionResponse::Scalar(Location {
                uri,
                range: span_to_range(target.range),
            }))
        });
        Ok(result)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri_str = params
            .text_document_position
            .text_document
            .uri
            .as_str()
            .to_string();
        let pos = params.text_document_position.position;
        tracing::debug!("completion: {}:{}:{}", uri_str, pos.line, pos.character);

        let settings = self.settings.lock().await.clone();
        if !self.framework_enabled(&settings) {
            return Ok(None);
        }
        let rel = self.relative_file(&uri_str);

        let lsp_items = self
            .with_document(&uri_str, rel.as_deref(), |doc| {
                let context =
                    detect_context(doc.tree, doc.source, pos.line, pos.character, doc.symbols);
                if context == CompletionContext::None {
                    return None;
                }
                Some(provide_completions(
                    &context,
                    &self.index,
                    doc.file,
                    settings.max_path_variants,
                ))
            })
            .unwrap_or_default();

        let items: Vec<CompletionItem> = lsp_items
            .into_iter()
            .map(lsp_completion_item_to_ls)
            .collect();

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri_str = params.text_document.uri.as_str().to_string();
        tracing::debug!("documentLink: {}", uri_str);

        let settings = self.settings.lock().await.clone();
        if !self.framework_enabled(&settings) {
            return Ok(None);
        }
        let rel = self.relative_file(&uri_str);

        let links = self
            .with_document(&uri_str, rel.as_deref(), |doc| {
                Some(annotations::document_links(doc, &self.index))
            })
            .unwrap_or_default();

        let links: Vec<DocumentLink> = links
            .into_iter()
            .filter_map(|(span, target)| {
                Some(DocumentLink {
                    range: span_to_range(span),
                    target: Some(path_to_uri(&target.path)?),
                    tooltip: None,
                    data: None,
                })
            })
            .collect();
        Ok(Some(links))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<WorkspaceSymbolResponse>> {
        let settings = self.settings.lock().await.clone();
        if !self.framework_enabled(&settings) {
            return Ok(None);
        }

        let symbols: Vec<SymbolInformation> = self
            .index
            .search_routes(&params.query)
            .into_iter()
            .take(MAX_WORKSPACE_SYMBOLS)
            .filter_map(|route| {
                let path = self.index.absolute_path(&route.file)?;
                let uri = path_to_uri(&path)?;
                #[allow(deprecated)]
                Some(SymbolInformation {
                    name: format!("{} {}", route.methods.join("|"), route.full_address),
                    kind: SymbolKind::FUNCTION,
                    tags: None,
                    deprecated: None,
                    location: Location {
                        uri,
                        range: span_to_range(route.range),
                    },
                    container_name: route.name,
                })
            })
            .collect();

        Ok(Some(WorkspaceSymbolResponse::Flat(symbols)))
    }
}
