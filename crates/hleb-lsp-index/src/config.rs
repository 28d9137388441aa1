//! Configuration files and parameter lookup.
//!
//! A config name such as `main` maps to `config/main.php` plus variants like
//! `config/main-local.php`. Modules may override `main` and `database` with
//! their own `config/` directory.

use hleb_lsp_types::{is_module_config, UNDEFINED_VALUE};
use regex::Regex;
use std::sync::OnceLock;

use crate::tree::{ancestors, file_name, join, parent, EntryKind, ProjectTree};

/// A `.php` file inside a `config` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    /// Root-relative path.
    pub path: String,
    /// File stem (`main` for `config/main.php`).
    pub name: String,
    /// Open buffer text, or the disk content.
    pub text: String,
}

impl ConfigDocument {
    pub fn new(path: &str, text: String) -> Self {
        ConfigDocument {
            path: path.to_string(),
            name: config_name_of(path).unwrap_or_default(),
            text,
        }
    }
}

/// Whether a root-relative path is a config document.
pub fn is_config_path(rel: &str) -> bool {
    rel.ends_with(".php") && file_name(parent(rel)) == "config" && !parent(rel).is_empty()
}

/// Config name of a config document path.
pub fn config_name_of(rel: &str) -> Option<String> {
    file_name(rel).strip_suffix(".php").map(str::to_string)
}

/// Matches `name.php` and `name-<anything>.php`.
fn config_name_regex(config_name: &str) -> Option<Regex> {
    Regex::new(&format!(r"^{}(-.*)?\.php$", regex::escape(config_name))).ok()
}

/// Candidate files for one config name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFiles {
    /// Files in `<root>/config`, longest path first.
    pub project: Vec<String>,
    /// Files in the current module's `config`, longest path first.
    pub module: Vec<String>,
    /// The module overrides this config (it has exactly `<name>.php`).
    pub module_active: bool,
}

impl ConfigFiles {
    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.module.is_empty()
    }

    /// All candidates, active group first, flagged `true` for module files.
    pub fn ordered(&self) -> Vec<(&str, bool)> {
        let project = self.project.iter().map(|f| (f.as_str(), false));
        let module = self.module.iter().map(|f| (f.as_str(), true));
        if self.module_active {
            module.chain(project).collect()
        } else {
            project.chain(module).collect()
        }
    }
}

/// Find the config files for `config_name` as seen from `current_file`.
pub fn config_files(tree: &ProjectTree, current_file: Option<&str>, config_name: &str) -> ConfigFiles {
    let project = files_in_dir(tree, "config", config_name);

    let module = match current_file.and_then(|f| module_config_dir(tree, f)) {
        Some(dir) if is_module_config(config_name) => files_in_dir(tree, &dir, config_name),
        _ => Vec::new(),
    };
    let target = format!("{}.php", config_name);
    let module_active = module.iter().any(|f| file_name(f) == target);

    ConfigFiles {
        project,
        module,
        module_active,
    }
}

fn files_in_dir(tree: &ProjectTree, dir: &str, config_name: &str) -> Vec<String> {
    let Some(re) = config_name_regex(config_name) else {
        return Vec::new();
    };
    let mut files: Vec<String> = tree
        .children(dir)
        .into_iter()
        .filter(|(name, kind)| *kind == EntryKind::File && re.is_match(name))
        .map(|(name, _)| join(dir, &name))
        .collect();
    sort_desc(&mut files);
    files
}

/// Longest path first; equal lengths by path.
pub fn sort_desc(files: &mut [String]) {
    files.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
}

/// The `config` directory of the module containing `current_file`.
///
/// The nearest ancestor with a `config` directory wins; the project's own
/// `config` directory is not a module.
pub fn module_config_dir(tree: &ProjectTree, current_file: &str) -> Option<String> {
    for dir in ancestors(current_file) {
        let candidate = join(dir, "config");
        if tree.is_dir(&candidate) {
            if dir.is_empty() {
                return None;
            }
            return Some(candidate);
        }
    }
    None
}

/// Config names offered for completion: the basic names plus every name
/// with a file in `<root>/config`.
pub fn config_names(tree: &ProjectTree) -> Vec<String> {
    let mut names: Vec<String> = hleb_lsp_types::BASIC_CONFIG_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect();
    for (name, kind) in tree.children("config") {
        if kind != EntryKind::File {
            continue;
        }
        if let Some(stem) = name.strip_suffix(".php") {
            // `main-local.php` belongs to `main`.
            let base = stem.split('-').next().unwrap_or(stem);
            if !base.is_empty() && !names.iter().any(|n| n == base) {
                names.push(base.to_string());
            }
        }
    }
    names
}

/// Value of `key` in one config file's text, normalised for display.
///
/// `None` when the key is not declared in the text.
pub fn find_param(text: &str, config_name: &str, key: &str) -> Option<String> {
    let pattern = format!(
        r#"(?ms)^\s*["']{}["']\s*=>\s*(?:["']([^"']+)["']|([^\]]+))\s*(?:,|\]|$)"#,
        regex::escape(key)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or("");

    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.starts_with("get_env") {
        return Some(match get_env_default(trimmed) {
            Some(default) => normalize_value(default, config_name, key),
            None => UNDEFINED_VALUE.to_string(),
        });
    }
    Some(normalize_value(value, config_name, key))
}

fn get_env_default(value: &str) -> Option<&str> {
    static GET_ENV: OnceLock<Option<Regex>> = OnceLock::new();
    let re = GET_ENV
        .get_or_init(|| Regex::new(r#"(?s)get_env\s*\(\s*["'].*?["']\s*,\s*(.+?)\s*\)"#).ok())
        .as_ref()?;
    re.captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Turn a raw parameter value into the text shown in hovers.
pub fn normalize_value(value: &str, config_name: &str, key: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    let quoted = value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')));
    if quoted {
        return value[1..value.len() - 1].to_string();
    }
    if config_name == "database" && !key.ends_with(".db.type") && key != "db.settings.list" {
        return UNDEFINED_VALUE.to_string();
    }
    if value.starts_with('[') {
        return "Array".to_string();
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => "true".to_string(),
        "false" => "false".to_string(),
        "null" => "null".to_string(),
        _ => match value.find(',') {
            Some(i) => value[..i].trim().to_string(),
            None if value.chars().count() > 100 => UNDEFINED_VALUE.to_string(),
            None => value.trim().to_string(),
        },
    }
}

/// Every quoted array key declared in a config file, in order of appearance.
pub fn config_keys(text: &str) -> Vec<String> {
    static KEY: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = KEY
        .get_or_init(|| Regex::new(r#"(?m)^\s*["']([^"'$]+)["']\s*=>"#).ok())
        .as_ref()
    else {
        return Vec::new();
    };
    let mut keys: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        let key = caps[1].to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// One file's answer for a parameter lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEntry {
    pub file: String,
    pub value: String,
    pub module: bool,
}

/// Look `key` up in the candidate files, active group first.
///
/// Files that do not declare the key are left out; a candidate whose text is
/// unavailable reports `undefined`.
pub fn lookup_param<F>(files: &ConfigFiles, config_name: &str, key: &str, text_of: F) -> Vec<ParamEntry>
where
    F: Fn(&str) -> Option<String>,
{
    let mut entries = Vec::new();
    for (file, module) in files.ordered() {
        let value = match text_of(file) {
            Some(text) => match find_param(&text, config_name, key) {
                Some(value) => value,
                None => continue,
            },
            None => UNDEFINED_VALUE.to_string(),
        };
        entries.push(ParamEntry {
            file: file.to_string(),
            value,
            module,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(files: &[&str]) -> ProjectTree {
        let tree = ProjectTree::new();
        for f in files {
            tree.insert(f, EntryKind::File);
        }
        tree
    }

    #[test]
    fn test_config_name_pattern() {
        let re = config_name_regex("main").unwrap();
        assert!(re.is_match("main.php"));
        assert!(re.is_match("main-local.php"));
        assert!(!re.is_match("mainly.php"));
        assert!(!re.is_match("main.php.bak"));
        assert!(!re.is_match("xmain.php"));
    }

    #[test]
    fn test_project_files_sorted_longest_first() {
        let tree = tree_with(&[
            "config/main.php",
            "config/main-local.php",
            "config/main-a.php",
            "config/common.php",
        ]);
        let files = config_files(&tree, Some("app/Controllers/X.php"), "main");
        assert_eq!(
            files.project,
            vec!["config/main-local.php", "config/main-a.php", "config/main.php"]
        );
        assert!(files.module.is_empty());
        assert!(!files.module_active);
    }

    #[test]
    fn test_module_files_only_for_main_and_database() {
        let tree = tree_with(&[
            "config/main.php",
            "config/common.php",
            "modules/blog/config/main.php",
            "modules/blog/config/common.php",
            "modules/blog/controllers/PostController.php",
        ]);
        let current = Some("modules/blog/controllers/PostController.php");

        let main = config_files(&tree, current, "main");
        assert_eq!(main.module, vec!["modules/blog/config/main.php"]);
        assert!(main.module_active);
        let ordered: Vec<_> = main.ordered().into_iter().map(|(f, _)| f).collect();
        assert_eq!(ordered, vec!["modules/blog/config/main.php", "config/main.php"]);

        let common = config_files(&tree, current, "common");
        assert!(common.module.is_empty());
    }

    #[test]
    fn test_module_inactive_without_exact_name() {
        let tree = tree_with(&[
            "config/main.php",
            "modules/blog/config/main-extra.php",
            "modules/blog/X.php",
        ]);
        let files = config_files(&tree, Some("modules/blog/X.php"), "main");
        assert_eq!(files.module, vec!["modules/blog/config/main-extra.php"]);
        assert!(!files.module_active);
        assert_eq!(files.ordered()[0].0, "config/main.php");
    }

    #[test]
    fn test_project_config_dir_is_not_a_module() {
        let tree = tree_with(&["config/main.php", "app/X.php"]);
        assert_eq!(module_config_dir(&tree, "app/X.php"), None);
        assert_eq!(module_config_dir(&tree, "config/main.php"), None);
    }

    #[test]
    fn test_find_param_quoted() {
        let text = "<?php\nreturn [\n    'timezone' => 'Europe/Moscow',\n    \"debug\" => true,\n];\n";
        assert_eq!(find_param(text, "common", "timezone").as_deref(), Some("Europe/Moscow"));
        assert_eq!(find_param(text, "common", "debug").as_deref(), Some("true"));
        assert_eq!(find_param(text, "common", "missing"), None);
    }

    #[test]
    fn test_find_param_get_env_default() {
        let text = "<?php\nreturn [\n    'debug' => get_env('APP_DEBUG', false),\n];\n";
        assert_eq!(find_param(text, "common", "debug").as_deref(), Some("false"));
    }

    #[test]
    fn test_find_param_array_and_escaped_key() {
        let text = "<?php\nreturn [\n    'allowed.ips' => ['127.0.0.1'],\n    'allowedXips' => 1,\n];\n";
        assert_eq!(find_param(text, "main", "allowed.ips").as_deref(), Some("Array"));
    }

    #[test]
    fn test_database_values_mostly_undefined() {
        let text = "<?php\nreturn [\n    'base.db.type' => 'mysql.default',\n    'db.settings.list' => [],\n    'port' => 3306,\n];\n";
        assert_eq!(
            find_param(text, "database", "base.db.type").as_deref(),
            Some("mysql.default")
        );
        assert_eq!(find_param(text, "database", "db.settings.list").as_deref(), Some("Array"));
        assert_eq!(find_param(text, "database", "port").as_deref(), Some(UNDEFINED_VALUE));
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("", "main", "k"), "\"\"");
        assert_eq!(normalize_value("'x'", "main", "k"), "x");
        assert_eq!(normalize_value("NULL", "main", "k"), "null");
        assert_eq!(normalize_value("100,\n 'b' => 2", "main", "k"), "100");
        assert_eq!(normalize_value(&"a".repeat(101), "main", "k"), UNDEFINED_VALUE);
        assert_eq!(normalize_value("[1, 2", "main", "k"), "Array");
    }

    #[test]
    fn test_config_keys() {
        let text = "<?php\nreturn [\n    'debug' => true,\n    'timezone' => 'UTC',\n    'debug' => false,\n];\n";
        assert_eq!(config_keys(text), vec!["debug", "timezone"]);
    }

    #[test]
    fn test_config_names_include_found_files() {
        let tree = tree_with(&["config/main.php", "config/payments-local.php", "config/mail.php"]);
        let names = config_names(&tree);
        assert_eq!(&names[..4], &["common", "database", "main", "system"]);
        assert!(names.contains(&"payments".to_string()));
        assert!(names.contains(&"mail".to_string()));
    }

    #[test]
    fn test_lookup_param_skips_undeclared() {
        let tree = tree_with(&["config/main.php", "config/main-local.php"]);
        let files = config_files(&tree, None, "main");
        let entries = lookup_param(&files, "main", "debug", |f| match f {
            "config/main.php" => Some("<?php return [\n'debug' => true,\n];".to_string()),
            _ => Some("<?php return [];".to_string()),
        });
        assert_eq!(
            entries,
            vec![ParamEntry {
                file: "config/main.php".to_string(),
                value: "true".to_string(),
                module: false,
            }]
        );
    }

    #[test]
    fn test_is_config_path() {
        assert!(is_config_path("config/main.php"));
        assert!(is_config_path("modules/blog/config/main.php"));
        assert!(!is_config_path("config/readme.md"));
        assert!(!is_config_path("main.php"));
        assert_eq!(config_name_of("config/main-local.php").as_deref(), Some("main-local"));
    }
}
