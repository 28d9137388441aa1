//! Framework model of one HLEB2 project.
//!
//! `FrameworkIndex` owns the project tree, the text of every config
//! document, the declared routes and the composer manifest. Updates replace
//! one file's entries at a time, so concurrent readers see either the old or
//! the new state of that file.

use dashmap::{DashMap, DashSet};
use hleb_lsp_types::{span_contains, PathOptions, RouteInfo};
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use crate::composer::{parse_composer_json, ComposerManifest};
use crate::config::{self, is_config_path, ConfigDocument, ConfigFiles, ParamEntry};
use crate::detect::is_framework_project;
use crate::error::{IndexError, IndexResult};
use crate::paths::{self, PathTarget};
use crate::routes::{extract_routes, is_route_file};
use crate::tree::{is_in_skipped_dir, join, EntryKind, ProjectTree};
use crate::views::{self, ViewVariant};

const COMPOSER_FILE: &str = "composer.json";

/// Kind of a file system event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Created,
    Changed,
    Deleted,
}

/// Totals of a full load, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub entries: usize,
    pub config_documents: usize,
    pub route_files: usize,
    pub routes: usize,
}

pub struct FrameworkIndex {
    pub tree: ProjectTree,
    /// Root-relative path → config document.
    pub config_documents: DashMap<String, ConfigDocument>,
    /// Root-relative route file → its routes in declaration order.
    pub routes: DashMap<String, Vec<RouteInfo>>,
    /// Files whose data currently comes from an editor buffer.
    buffers: DashSet<String>,
    root: RwLock<Option<PathBuf>>,
    composer: RwLock<Option<ComposerManifest>>,
}

impl FrameworkIndex {
    pub fn new() -> Self {
        FrameworkIndex {
            tree: ProjectTree::new(),
            config_documents: DashMap::new(),
            routes: DashMap::new(),
            buffers: DashSet::new(),
            root: RwLock::new(None),
            composer: RwLock::new(None),
        }
    }

    /// Scan `root` and build the whole model.
    pub fn load(&self, root: &Path) -> IndexResult<LoadSummary> {
        *self.root.write().unwrap_or_else(|e| e.into_inner()) = Some(root.to_path_buf());
        self.tree.rescan(root)?;
        self.config_documents.clear();
        self.routes.clear();
        self.reload_composer();

        for file in self.tree.files_under("") {
            if is_config_path(&file) || is_route_file(&file) {
                self.reload_file(&file);
            }
        }

        Ok(LoadSummary {
            entries: self.tree.len(),
            config_documents: self.config_documents.len(),
            route_files: self.routes.len(),
            routes: self.routes.iter().map(|r| r.value().len()).sum(),
        })
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Root-relative `/`-separated form of an absolute path.
    pub fn relative_path(&self, path: &Path) -> IndexResult<String> {
        let root = self.root().ok_or(IndexError::NoRoot)?;
        let relative = path.strip_prefix(&root).map_err(|_| IndexError::OutsideRoot {
            path: path.to_path_buf(),
        })?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
                Component::CurDir => {}
                _ => {
                    return Err(IndexError::OutsideRoot {
                        path: path.to_path_buf(),
                    })
                }
            }
        }
        Ok(parts.join("/"))
    }

    pub fn absolute_path(&self, rel: &str) -> Option<PathBuf> {
        let root = self.root()?;
        Some(rel.split('/').filter(|s| !s.is_empty()).fold(root, |p, s| p.join(s)))
    }

    /// Whether framework features apply to this project.
    pub fn is_framework_project(&self) -> bool {
        let composer = self.composer.read().unwrap_or_else(|e| e.into_inner());
        is_framework_project(self.root().is_some(), &self.tree, composer.as_ref())
    }

    // ── Invalidation ────────────────────────────────────────────────────────

    /// Apply a file system event for an absolute path.
    pub fn apply_change(&self, path: &Path, change: FileChange) -> IndexResult<()> {
        let rel = self.relative_path(path)?;
        if rel.is_empty() || is_in_skipped_dir(&rel) {
            return Ok(());
        }
        tracing::debug!("{:?} {}", change, rel);

        match change {
            FileChange::Created => {
                let metadata = std::fs::metadata(path).map_err(|e| IndexError::io(path, e))?;
                if metadata.is_dir() {
                    self.tree.insert(&rel, EntryKind::Dir);
                    self.tree.scan_dir(path, &rel)?;
                    for file in self.tree.files_under(&rel) {
                        self.reload_file(&file);
                    }
                } else {
                    self.tree.insert(&rel, EntryKind::File);
                    self.reload_file(&rel);
                }
            }
            FileChange::Changed => {
                if self.tree.kind(&rel).is_none() && path.is_file() {
                    self.tree.insert(&rel, EntryKind::File);
                }
                if !self.buffers.contains(&rel) {
                    self.reload_file(&rel);
                }
            }
            FileChange::Deleted => {
                let mut removed = self.tree.remove(&rel);
                if removed.is_empty() {
                    removed.push(rel.clone());
                }
                for file in removed {
                    self.forget_file(&file);
                }
            }
        }
        Ok(())
    }

    /// Use an editor buffer as the content of a config or route file.
    pub fn update_buffer(&self, rel: &str, text: &str) {
        if is_config_path(rel) {
            self.buffers.insert(rel.to_string());
            self.config_documents
                .insert(rel.to_string(), ConfigDocument::new(rel, text.to_string()));
        } else if is_route_file(rel) {
            self.buffers.insert(rel.to_string());
            self.routes.insert(rel.to_string(), extract_routes(text, rel));
        }
    }

    /// The buffer was closed; go back to the disk content.
    pub fn close_buffer(&self, rel: &str) {
        if self.buffers.remove(rel).is_some() {
            self.reload_file(rel);
        }
    }

    /// Re-read one file's data from disk. A saved file the watcher has not
    /// reported yet joins the tree here.
    pub fn reload_from_disk(&self, rel: &str) {
        if !is_in_skipped_dir(rel) && self.absolute_path(rel).is_some_and(|path| path.is_file()) {
            self.tree.insert(rel, EntryKind::File);
        }
        self.reload_file(rel);
    }

    fn reload_file(&self, rel: &str) {
        if rel == COMPOSER_FILE {
            self.reload_composer();
            return;
        }
        if !is_config_path(rel) && !is_route_file(rel) {
            return;
        }
        if !self.absolute_path(rel).is_some_and(|path| path.is_file()) {
            self.tree.remove(rel);
            self.forget_file(rel);
            return;
        }
        let Some(text) = self.read_disk(rel) else {
            self.forget_file(rel);
            return;
        };
        if is_config_path(rel) {
            self.config_documents
                .insert(rel.to_string(), ConfigDocument::new(rel, text));
        } else {
            self.routes.insert(rel.to_string(), extract_routes(&text, rel));
        }
    }

    fn forget_file(&self, rel: &str) {
        self.config_documents.remove(rel);
        self.routes.remove(rel);
        self.buffers.remove(rel);
        if rel == COMPOSER_FILE {
            *self.composer.write().unwrap_or_else(|e| e.into_inner()) = None;
        }
    }

    fn reload_composer(&self) {
        let manifest = self.absolute_path(COMPOSER_FILE).filter(|p| p.is_file()).and_then(|path| {
            parse_composer_json(&path)
                .map_err(|e| tracing::warn!("{}", e))
                .ok()
        });
        *self.composer.write().unwrap_or_else(|e| e.into_inner()) = manifest;
    }

    fn read_disk(&self, rel: &str) -> Option<String> {
        let path = self.absolute_path(rel)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("{}", IndexError::io(path, e));
                None
            }
        }
    }

    // ── Configuration ───────────────────────────────────────────────────────

    pub fn config_files(&self, current_file: Option<&str>, config_name: &str) -> ConfigFiles {
        config::config_files(&self.tree, current_file, config_name)
    }

    /// Text of a config document: the buffer or indexed disk content.
    pub fn config_text(&self, rel: &str) -> Option<String> {
        if let Some(doc) = self.config_documents.get(rel) {
            return Some(doc.text.clone());
        }
        self.read_disk(rel)
    }

    /// Look a parameter up in every candidate file of `config_name`.
    pub fn lookup_param(
        &self,
        current_file: Option<&str>,
        config_name: &str,
        key: &str,
    ) -> (ConfigFiles, Vec<ParamEntry>) {
        let files = self.config_files(current_file, config_name);
        let entries = config::lookup_param(&files, config_name, key, |f| self.config_text(f));
        (files, entries)
    }

    pub fn config_names(&self) -> Vec<String> {
        config::config_names(&self.tree)
    }

    /// Keys declared in any candidate file of `config_name`.
    pub fn config_keys(&self, current_file: Option<&str>, config_name: &str) -> Vec<String> {
        let files = self.config_files(current_file, config_name);
        let mut keys: Vec<String> = Vec::new();
        for (file, _) in files.ordered() {
            let Some(text) = self.config_text(file) else {
                continue;
            };
            for key in config::config_keys(&text) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    // ── Paths and views ─────────────────────────────────────────────────────

    pub fn resolve_path(&self, literal: &str, options: PathOptions) -> Option<PathTarget> {
        let root = self.root();
        paths::resolve_path(&self.tree, root.as_deref(), literal, options)
    }

    pub fn path_variants(&self, typed: &str, options: PathOptions, limit: usize) -> Vec<String> {
        paths::path_variants(&self.tree, typed, options, limit)
    }

    pub fn resolve_view(&self, current_file: Option<&str>, literal: &str) -> Option<String> {
        views::resolve_view(&self.tree, current_file, literal)
    }

    pub fn view_variants(&self, current_file: Option<&str>, limit: usize) -> Vec<ViewVariant> {
        views::view_variants(&self.tree, current_file, limit)
    }

    // ── Routes ──────────────────────────────────────────────────────────────

    /// Every route, ordered by file and position.
    pub fn all_routes(&self) -> Vec<RouteInfo> {
        let mut routes: Vec<RouteInfo> = self
            .routes
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| a.file.cmp(&b.file).then(a.range.cmp(&b.range)));
        routes
    }

    /// Distinct route names in declaration order.
    pub fn route_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for route in self.all_routes() {
            if let Some(name) = route.name {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn find_route_by_name(&self, name: &str) -> Option<RouteInfo> {
        self.all_routes()
            .into_iter()
            .find(|r| r.name.as_deref() == Some(name))
    }

    /// Route whose address literal contains the position.
    pub fn route_at(&self, file: &str, line: u32, col: u32) -> Option<RouteInfo> {
        self.routes
            .get(file)?
            .iter()
            .find(|r| span_contains(r.range, line, col))
            .cloned()
    }

    /// Routes whose name or effective address contains `query`
    /// (case-insensitive). An empty query matches everything.
    pub fn search_routes(&self, query: &str) -> Vec<RouteInfo> {
        let query = query.to_lowercase();
        self.all_routes()
            .into_iter()
            .filter(|r| {
                r.full_address.to_lowercase().contains(&query)
                    || r.name.as_ref().is_some_and(|n| n.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// File declaring a route's controller class, found through PSR-4.
    pub fn controller_file(&self, controller: &str) -> Option<String> {
        let class = controller.split("::").next().unwrap_or(controller);
        let composer = self.composer.read().unwrap_or_else(|e| e.into_inner());
        let candidates = match composer.as_ref() {
            Some(manifest) => manifest.resolve_class_to_paths(class),
            // Default HLEB2 layout.
            None => class
                .strip_prefix("App\\")
                .map(|rest| vec![join("app", &(rest.replace('\\', "/") + ".php"))])
                .unwrap_or_default(),
        };
        candidates.into_iter().find(|f| self.tree.is_file(f))
    }
}

impl Default for FrameworkIndex {
    fn default() -> Self {
        Self::new()
    }
}
