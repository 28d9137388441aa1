//! File path arguments: `hl_path('@storage/logs')`, `Path::get('@app/x.php')`.

use hleb_lsp_types::{PathAlias, PathMode, PathOptions};
use std::path::{Path, PathBuf};

use crate::tree::{join, EntryKind, ProjectTree};

/// Where a path argument points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// Root-relative file inside the project.
    Project(String),
    /// Absolute file outside the alias scheme.
    Absolute(PathBuf),
}

/// Backslashes become `/` and quotes are dropped.
pub fn normalize_path(text: &str) -> String {
    text.replace('\\', "/").replace(['"', '\''], "")
}

/// Split `@alias/rest` into the alias and the rest.
pub fn split_alias(path: &str) -> Option<(PathAlias, &str)> {
    let (prefix, rest) = match path.split_once('/') {
        Some((prefix, rest)) => (prefix, rest),
        None => (path, ""),
    };
    PathAlias::from_prefix(prefix).map(|alias| (alias, rest))
}

/// Resolve a path argument to the file it names.
///
/// `root` is used for files the tree does not hold (skipped directories).
pub fn resolve_path(
    tree: &ProjectTree,
    root: Option<&Path>,
    literal: &str,
    options: PathOptions,
) -> Option<PathTarget> {
    let path = normalize_path(literal);
    if path.is_empty() || path.contains("..") || options.mode == PathMode::Directories {
        return None;
    }

    if !path.starts_with('@') {
        if options.alias_only {
            return None;
        }
        let absolute = Path::new(&path);
        if absolute.is_absolute() && absolute.is_file() {
            return Some(PathTarget::Absolute(absolute.to_path_buf()));
        }
        return None;
    }

    let (alias, rest) = split_alias(&path)?;
    let rel = join(alias.base_dir(), rest.trim_matches('/'));
    if rel.is_empty() {
        return None;
    }
    match tree.kind(&rel) {
        Some(EntryKind::File) => Some(PathTarget::Project(rel)),
        Some(EntryKind::Dir) => None,
        None => match root {
            Some(root) if root.join(&rel).is_file() => Some(PathTarget::Project(rel)),
            _ => None,
        },
    }
}

/// Completion candidates for a path argument, restricted to those that can
/// still match `typed` and capped at `limit`.
pub fn path_variants(
    tree: &ProjectTree,
    typed: &str,
    options: PathOptions,
    limit: usize,
) -> Vec<String> {
    let typed = normalize_path(typed);
    if options.alias_only && !typed.starts_with('@') {
        return Vec::new();
    }

    let mut collector = Collector {
        typed: &typed,
        limit,
        variants: Vec::new(),
    };
    for alias in PathAlias::ALL {
        let base = alias.base_dir();
        if !tree.is_dir(base) {
            continue;
        }
        let prefix = alias.prefix();
        match options.mode {
            PathMode::Directories => collector.add_directories(tree, base, prefix),
            PathMode::FilesAndDirectories => {
                collector.add_directories(tree, base, prefix);
                collector.add_files(tree, base, prefix);
            }
            PathMode::Files => collector.add_files(tree, base, prefix),
        }
        if collector.full() {
            break;
        }
    }
    collector.variants
}

struct Collector<'a> {
    typed: &'a str,
    limit: usize,
    variants: Vec<String>,
}

impl Collector<'_> {
    fn full(&self) -> bool {
        self.variants.len() >= self.limit
    }

    /// The variant or something below it may match what was typed.
    fn reachable(&self, candidate: &str) -> bool {
        candidate.starts_with(self.typed) || self.typed.starts_with(candidate)
    }

    fn push(&mut self, candidate: String) {
        if !self.full() && candidate.starts_with(self.typed) {
            self.variants.push(candidate);
        }
    }

    /// Non-hidden directories, depth first.
    fn add_directories(&mut self, tree: &ProjectTree, dir: &str, shown: &str) {
        for (name, kind) in tree.children(dir) {
            if self.full() {
                return;
            }
            if kind != EntryKind::Dir || name.starts_with('.') {
                continue;
            }
            let candidate = format!("{}/{}", shown, name);
            if !self.reachable(&candidate) {
                continue;
            }
            self.push(candidate.clone());
            self.add_directories(tree, &join(dir, &name), &candidate);
        }
    }

    /// PHP files of a directory first, then subdirectories and other files.
    fn add_files(&mut self, tree: &ProjectTree, dir: &str, shown: &str) {
        let children = tree.children(dir);
        for (name, kind) in &children {
            if *kind == EntryKind::File && name.ends_with(".php") {
                self.push(format!("{}/{}", shown, name));
            }
        }
        for (name, kind) in &children {
            if self.full() {
                return;
            }
            let candidate = format!("{}/{}", shown, name);
            match kind {
                EntryKind::Dir => {
                    if self.reachable(&candidate) {
                        self.add_files(tree, &join(dir, name), &candidate);
                    }
                }
                EntryKind::File if !name.ends_with(".php") => self.push(candidate),
                EntryKind::File => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectTree {
        let tree = ProjectTree::new();
        for f in [
            "app/Bootstrap/BaseContainer.php",
            "resources/views/index.php",
            "resources/views/readme.txt",
            "resources/views/parts/header.php",
            "storage/logs/app.log",
            "public/index.php",
        ] {
            tree.insert(f, EntryKind::File);
        }
        tree
    }

    fn files() -> PathOptions {
        PathOptions::default()
    }

    #[test]
    fn test_resolve_alias_paths() {
        let tree = project();
        assert_eq!(
            resolve_path(&tree, None, "'@views/index.php'", files()),
            Some(PathTarget::Project("resources/views/index.php".to_string()))
        );
        assert_eq!(
            resolve_path(&tree, None, "@/public/index.php", files()),
            Some(PathTarget::Project("public/index.php".to_string()))
        );
        assert_eq!(
            resolve_path(&tree, None, "@global/public/index.php", files()),
            Some(PathTarget::Project("public/index.php".to_string()))
        );
        assert_eq!(
            resolve_path(&tree, None, "@app\\Bootstrap\\BaseContainer.php", files()),
            Some(PathTarget::Project("app/Bootstrap/BaseContainer.php".to_string()))
        );
    }

    #[test]
    fn test_resolve_rejects() {
        let tree = project();
        assert_eq!(resolve_path(&tree, None, "", files()), None);
        assert_eq!(resolve_path(&tree, None, "@views/../index.php", files()), None);
        assert_eq!(resolve_path(&tree, None, "@views/parts", files()), None);
        assert_eq!(resolve_path(&tree, None, "@vendor/x.php", files()), None);
        assert_eq!(resolve_path(&tree, None, "@views/missing.php", files()), None);
        let dirs = PathOptions {
            mode: PathMode::Directories,
            alias_only: false,
        };
        assert_eq!(resolve_path(&tree, None, "@views/index.php", dirs), None);
    }

    #[test]
    fn test_resolve_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("outside.php");
        std::fs::write(&file, "<?php").unwrap();
        let tree = project();
        let literal = file.to_string_lossy().to_string();

        assert_eq!(
            resolve_path(&tree, None, &literal, files()),
            Some(PathTarget::Absolute(file.clone()))
        );
        let alias_only = PathOptions {
            mode: PathMode::Files,
            alias_only: true,
        };
        assert_eq!(resolve_path(&tree, None, &literal, alias_only), None);
    }

    #[test]
    fn test_resolve_falls_back_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("vendor/autoload.php"), "<?php").unwrap();
        let tree = project();

        assert_eq!(
            resolve_path(&tree, Some(dir.path()), "@/vendor/autoload.php", files()),
            Some(PathTarget::Project("vendor/autoload.php".to_string()))
        );
    }

    #[test]
    fn test_file_variants_php_first() {
        let tree = project();
        let variants = path_variants(&tree, "@views", files(), 100);
        assert_eq!(
            variants,
            vec![
                "@views/index.php",
                "@views/parts/header.php",
                "@views/readme.txt",
            ]
        );
    }

    #[test]
    fn test_directory_variants() {
        let tree = project();
        let dirs = PathOptions {
            mode: PathMode::Directories,
            alias_only: false,
        };
        let variants = path_variants(&tree, "@storage", dirs, 100);
        assert_eq!(variants, vec!["@storage/logs"]);
    }

    #[test]
    fn test_files_and_directories_variants() {
        let tree = project();
        let both = PathOptions {
            mode: PathMode::FilesAndDirectories,
            alias_only: false,
        };
        let variants = path_variants(&tree, "@resources/views/p", both, 100);
        assert_eq!(
            variants,
            vec!["@resources/views/parts", "@resources/views/parts/header.php"]
        );
    }

    #[test]
    fn test_alias_only_requires_at() {
        let tree = project();
        let alias_only = PathOptions {
            mode: PathMode::Files,
            alias_only: true,
        };
        assert!(path_variants(&tree, "views", alias_only, 100).is_empty());
        assert!(!path_variants(&tree, "@", alias_only, 100).is_empty());
    }

    #[test]
    fn test_variants_capped() {
        let tree = project();
        assert_eq!(path_variants(&tree, "", files(), 2).len(), 2);
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("@views/a/b"), Some((PathAlias::Views, "a/b")));
        assert_eq!(split_alias("@storage"), Some((PathAlias::Storage, "")));
        assert_eq!(split_alias("@/x"), Some((PathAlias::Root, "x")));
        assert_eq!(split_alias("views/x"), None);
    }
}
