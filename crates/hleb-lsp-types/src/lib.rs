//! Shared types for hleb-lsp.
//!
//! Contains the framework model (path aliases, routes, config names),
//! import information and common data structures used across the parser,
//! index and completion crates.

use serde::{Deserialize, Serialize};

/// Identifier the integration is published under.
pub const PLUGIN_ID: &str = "hleb2-integration";

/// Host builds and host plugins the integration is declared against.
pub const HOST_COMPATIBILITY: HostCompatibility = HostCompatibility {
    since_build: "232",
    until_build: "252.*",
    plugins: &[
        ("com.jetbrains.php", "232.8660.205"),
        (
            "org.jetbrains.plugins.phpstorm-remote-interpreter",
            "232.8660.142",
        ),
    ],
};

/// Declarative compatibility metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCompatibility {
    pub since_build: &'static str,
    pub until_build: &'static str,
    /// (plugin id, build) pairs.
    pub plugins: &'static [(&'static str, &'static str)],
}

/// Line/column range: (start_line, start_col, end_line, end_col), 0-based.
pub type TextSpan = (u32, u32, u32, u32);

/// Whether `(line, col)` lies inside `span` (end inclusive, so a cursor right
/// before the closing quote still counts).
pub fn span_contains(span: TextSpan, line: u32, col: u32) -> bool {
    let (sl, sc, el, ec) = span;
    if line < sl || line > el {
        return false;
    }
    if line == sl && col < sc {
        return false;
    }
    if line == el && col > ec {
        return false;
    }
    true
}

/// A use statement in a PHP file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseStatement {
    pub fqn: String,
    pub alias: Option<String>,
    pub kind: UseKind,
}

/// Kind of use statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseKind {
    Class,
    Function,
    Constant,
}

/// Namespace and imports of a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSymbols {
    pub namespace: Option<String>,
    pub use_statements: Vec<UseStatement>,
}

/// Config files every HLEB2 project ships with.
pub const BASIC_CONFIG_NAMES: &[&str] = &["common", "database", "main", "system"];

/// Marker for a config parameter whose value could not be determined.
pub const UNDEFINED_VALUE: &str = "undefined";

/// Only these config files can be overridden by a module.
pub fn is_module_config(config_name: &str) -> bool {
    matches!(config_name, "main" | "database")
}

/// Path shortcut understood by the framework's path helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathAlias {
    /// `@`
    Root,
    /// `@global`
    Global,
    /// `@views`
    Views,
    /// `@app`
    App,
    /// `@resources`
    Resources,
    /// `@storage`
    Storage,
}

impl PathAlias {
    /// All aliases in the order they are offered for completion.
    pub const ALL: [PathAlias; 6] = [
        PathAlias::Root,
        PathAlias::Global,
        PathAlias::Views,
        PathAlias::App,
        PathAlias::Resources,
        PathAlias::Storage,
    ];

    /// Parse the leading segment of an alias path.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "@" => Some(PathAlias::Root),
            "@global" => Some(PathAlias::Global),
            "@views" => Some(PathAlias::Views),
            "@app" => Some(PathAlias::App),
            "@resources" => Some(PathAlias::Resources),
            "@storage" => Some(PathAlias::Storage),
            _ => None,
        }
    }

    /// The alias as written in PHP code.
    pub fn prefix(self) -> &'static str {
        match self {
            PathAlias::Root => "@",
            PathAlias::Global => "@global",
            PathAlias::Views => "@views",
            PathAlias::App => "@app",
            PathAlias::Resources => "@resources",
            PathAlias::Storage => "@storage",
        }
    }

    /// Directory the alias points to, relative to the project root ("" = root).
    pub fn base_dir(self) -> &'static str {
        match self {
            PathAlias::Root | PathAlias::Global => "",
            PathAlias::Views => "resources/views",
            PathAlias::App => "app",
            PathAlias::Resources => "resources",
            PathAlias::Storage => "storage",
        }
    }
}

/// Which filesystem entries a path argument refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PathMode {
    /// Files only.
    #[default]
    Files,
    /// Directories only (`isDir`-style helpers).
    Directories,
    /// Both (`get`, `getReal`, `exists`-style helpers).
    FilesAndDirectories,
}

/// Options of a path reference found in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PathOptions {
    pub mode: PathMode,
    /// Only `@alias/...` paths are meaningful for this argument.
    pub alias_only: bool,
}

/// A route declared in the project's route files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Upper-cased HTTP verbs (`ANY` for `Route::any`).
    pub methods: Vec<String>,
    /// Address as written in the route declaration.
    pub address: String,
    /// Address with the prefixes of enclosing groups applied.
    pub full_address: String,
    /// Route name from `->name('...')`.
    pub name: Option<String>,
    /// Controller from `->controller(Class::class, 'method')`.
    pub controller: Option<String>,
    /// Root-relative path of the declaring file.
    pub file: String,
    /// Range of the address literal.
    pub range: TextSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_round_trip_prefix() {
        for alias in PathAlias::ALL {
            assert_eq!(PathAlias::from_prefix(alias.prefix()), Some(alias));
        }
        assert_eq!(PathAlias::from_prefix("@vendor"), None);
        assert_eq!(PathAlias::from_prefix("views"), None);
    }

    #[test]
    fn test_alias_base_dirs() {
        assert_eq!(PathAlias::Root.base_dir(), "");
        assert_eq!(PathAlias::Global.base_dir(), "");
        assert_eq!(PathAlias::Views.base_dir(), "resources/views");
        assert_eq!(PathAlias::Storage.base_dir(), "storage");
    }

    #[test]
    fn test_module_config_names() {
        assert!(is_module_config("main"));
        assert!(is_module_config("database"));
        assert!(!is_module_config("common"));
        assert!(!is_module_config("system"));
    }

    #[test]
    fn test_span_contains() {
        let span = (2, 4, 2, 10);
        assert!(span_contains(span, 2, 4));
        assert!(span_contains(span, 2, 10));
        assert!(!span_contains(span, 2, 3));
        assert!(!span_contains(span, 2, 11));
        assert!(!span_contains(span, 1, 5));
        assert!(span_contains((1, 8, 3, 2), 2, 0));
    }

    #[test]
    fn test_host_compatibility() {
        assert_eq!(PLUGIN_ID, "hleb2-integration");
        assert_eq!(HOST_COMPATIBILITY.since_build, "232");
        assert_eq!(HOST_COMPATIBILITY.until_build, "252.*");
        assert_eq!(HOST_COMPATIBILITY.plugins.len(), 2);
    }
}
