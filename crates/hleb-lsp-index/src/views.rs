//! View template arguments: `view('index')`, `insertTemplate('parts/header')`.

use crate::tree::{ancestors, file_name, join, EntryKind, ProjectTree};

pub const DEFAULT_VIEW_DIR: &str = "resources/views";

/// The view directory used from `current_file`: the nearest ancestor with a
/// `views` directory (a module), otherwise the project's views.
///
/// Returns the directory and whether it came from the nearest-ancestor search.
pub fn view_dir(tree: &ProjectTree, current_file: Option<&str>) -> (String, bool) {
    if let Some(file) = current_file {
        for dir in ancestors(file) {
            let candidate = join(dir, "views");
            if tree.is_dir(&candidate) {
                return (candidate, true);
            }
        }
    }
    (DEFAULT_VIEW_DIR.to_string(), false)
}

/// Resolve a view name to a root-relative file.
pub fn resolve_view(tree: &ProjectTree, current_file: Option<&str>, literal: &str) -> Option<String> {
    let path = literal.replace('\\', "/");
    if path.is_empty() || path.contains("..") || path.starts_with('@') {
        return None;
    }
    let name = path.strip_prefix('/').unwrap_or(&path);
    let name = name.trim_end_matches(['/', '@']);

    let (mut dir, found) = view_dir(tree, current_file);
    if found && (name == "error" || name == "error.php") && !tree.is_file(&join(&dir, "error.php")) {
        dir = DEFAULT_VIEW_DIR.to_string();
    }

    let with_ext = join(&dir, &format!("{}.php", name));
    match tree.kind(&with_ext) {
        Some(EntryKind::File) => return Some(with_ext),
        Some(EntryKind::Dir) => return None,
        None => {}
    }
    let plain = join(&dir, name);
    if !name.is_empty() && tree.is_file(&plain) {
        return Some(plain);
    }
    None
}

/// A completion candidate for a view argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewVariant {
    /// Text inserted into the literal (PHP files without extension).
    pub label: String,
    /// Root-relative file.
    pub file: String,
    /// `(<view dir>/<file>)`.
    pub detail: String,
    /// Upper-case extension, empty when there is none.
    pub extension: String,
}

/// Every file under the view directory; PHP files of a directory come first.
pub fn view_variants(tree: &ProjectTree, current_file: Option<&str>, limit: usize) -> Vec<ViewVariant> {
    let (dir, _) = view_dir(tree, current_file);
    let mut variants = Vec::new();
    collect_views(tree, &dir, &dir, "", limit, &mut variants);
    variants
}

fn collect_views(
    tree: &ProjectTree,
    view_root: &str,
    dir: &str,
    parent: &str,
    limit: usize,
    variants: &mut Vec<ViewVariant>,
) {
    let children = tree.children(dir);
    let make = |name: &str, label: String| {
        let relative = join(parent, name);
        ViewVariant {
            label,
            file: join(view_root, &relative),
            detail: format!("({}/{})", view_root, relative),
            extension: extension_upper(name),
        }
    };

    for (name, kind) in &children {
        if variants.len() >= limit {
            return;
        }
        if *kind == EntryKind::File {
            if let Some(stem) = name.strip_suffix(".php") {
                variants.push(make(name, join(parent, stem)));
            }
        }
    }
    for (name, kind) in &children {
        if variants.len() >= limit {
            return;
        }
        match kind {
            EntryKind::Dir => collect_views(tree, view_root, &join(dir, name), &join(parent, name), limit, variants),
            EntryKind::File if !name.ends_with(".php") => variants.push(make(name, join(parent, name))),
            EntryKind::File => {}
        }
    }
}

/// `PHP` for `index.php`; empty for `Makefile` or `.env`.
pub fn extension_upper(name: &str) -> String {
    let name = file_name(name);
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => name[i + 1..].to_uppercase(),
        _ => String::new(),
    }
}
