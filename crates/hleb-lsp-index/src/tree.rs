//! In-memory picture of the project's files and directories.
//!
//! Paths are root-relative and `/`-separated; the root itself is `""`.

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{IndexError, IndexResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Every indexed file and directory under the project root.
pub struct ProjectTree {
    entries: DashMap<String, EntryKind>,
    /// Directory → names of its direct children.
    children: DashMap<String, BTreeSet<String>>,
}

impl ProjectTree {
    pub fn new() -> Self {
        let tree = ProjectTree {
            entries: DashMap::new(),
            children: DashMap::new(),
        };
        tree.entries.insert(String::new(), EntryKind::Dir);
        tree
    }

    /// Walk `root` once and record every entry outside skipped directories.
    ///
    /// An unreadable root is an error; an unreadable subdirectory only loses
    /// that subtree.
    pub fn scan(root: &Path) -> IndexResult<Self> {
        let tree = ProjectTree::new();
        tree.rescan(root)?;
        Ok(tree)
    }

    /// Drop everything and walk `root` again.
    pub fn rescan(&self, root: &Path) -> IndexResult<()> {
        self.clear();
        self.scan_dir(root, "")
    }

    /// Walk the directory `abs`, recorded as `rel`, adding what it contains.
    pub fn scan_dir(&self, abs: &Path, rel: &str) -> IndexResult<()> {
        let entries = std::fs::read_dir(abs).map_err(|e| IndexError::io(abs, e))?;

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let child_rel = join(rel, &name);
            if file_type.is_dir() {
                if is_skipped_dir(&name) {
                    continue;
                }
                self.insert(&child_rel, EntryKind::Dir);
                if let Err(e) = self.scan_dir(&entry.path(), &child_rel) {
                    tracing::warn!("{}", e);
                }
            } else if file_type.is_file() {
                self.insert(&child_rel, EntryKind::File);
            }
        }
        Ok(())
    }

    /// Record an entry, creating missing parent directories.
    pub fn insert(&self, rel: &str, kind: EntryKind) {
        if rel.is_empty() {
            return;
        }
        let parent = parent(rel);
        if !self.is_dir(parent) {
            self.insert(parent, EntryKind::Dir);
        }
        self.entries.insert(rel.to_string(), kind);
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(file_name(rel).to_string());
    }

    /// Remove an entry (and its subtree for a directory). Returns the removed
    /// file paths.
    pub fn remove(&self, rel: &str) -> Vec<String> {
        let mut removed = Vec::new();
        if rel.is_empty() {
            return removed;
        }
        self.remove_recursive(rel, &mut removed);
        if let Some(mut siblings) = self.children.get_mut(parent(rel)) {
            siblings.remove(file_name(rel));
        }
        removed
    }

    fn remove_recursive(&self, rel: &str, removed: &mut Vec<String>) {
        let Some((_, kind)) = self.entries.remove(rel) else {
            return;
        };
        match kind {
            EntryKind::File => removed.push(rel.to_string()),
            EntryKind::Dir => {
                let names = self
                    .children
                    .remove(rel)
                    .map(|(_, names)| names)
                    .unwrap_or_default();
                for name in names {
                    self.remove_recursive(&join(rel, &name), removed);
                }
            }
        }
    }

    pub fn kind(&self, rel: &str) -> Option<EntryKind> {
        self.entries.get(rel).map(|e| *e.value())
    }

    pub fn is_file(&self, rel: &str) -> bool {
        self.kind(rel) == Some(EntryKind::File)
    }

    pub fn is_dir(&self, rel: &str) -> bool {
        self.kind(rel) == Some(EntryKind::Dir)
    }

    /// Direct children of `dir` in name order.
    pub fn children(&self, dir: &str) -> Vec<(String, EntryKind)> {
        let names: Vec<String> = match self.children.get(dir) {
            Some(names) => names.iter().cloned().collect(),
            None => return Vec::new(),
        };
        names
            .into_iter()
            .filter_map(|name| {
                let kind = self.kind(&join(dir, &name))?;
                Some((name, kind))
            })
            .collect()
    }

    /// Every file under `dir`, recursively, in path order.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let mut files = Vec::new();
        for (name, kind) in self.children(dir) {
            let path = join(dir, &name);
            match kind {
                EntryKind::File => files.push(path),
                EntryKind::Dir => files.extend(self.files_under(&path)),
            }
        }
        files
    }

    pub fn len(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.children.clear();
        self.entries.insert(String::new(), EntryKind::Dir);
    }
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Directories the scan never enters.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == "vendor" || name == "node_modules"
}

/// Whether a root-relative path lies inside a skipped directory.
pub fn is_in_skipped_dir(rel: &str) -> bool {
    let mut segments: Vec<&str> = rel.split('/').collect();
    segments.pop();
    segments.into_iter().any(is_skipped_dir)
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

pub fn parent(rel: &str) -> &str {
    rel.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

pub fn file_name(rel: &str) -> &str {
    rel.rsplit_once('/').map(|(_, n)| n).unwrap_or(rel)
}

/// Ancestor directories of a file, nearest first, ending with the root `""`.
pub fn ancestors(rel_file: &str) -> Vec<&str> {
    let mut dirs = Vec::new();
    let mut current = rel_file;
    while !current.is_empty() {
        current = parent(current);
        dirs.push(current);
    }
    dirs
}
