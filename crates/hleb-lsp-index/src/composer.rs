//! composer.json parsing.
//!
//! Two things are read: whether the project requires the framework package,
//! and the PSR-4 map used to find controller classes of routes.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{IndexError, IndexResult};
use crate::tree::join;

/// Composer package of the framework core.
pub const FRAMEWORK_PACKAGE: &str = "phphleb/framework";

/// What the index needs from composer.json.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerManifest {
    /// `require` or `require-dev` lists the framework package.
    pub requires_framework: bool,
    /// PSR-4: namespace prefix → root-relative directories.
    pub psr4: Vec<(String, Vec<String>)>,
}

impl ComposerManifest {
    /// Candidate root-relative files for a fully qualified class name.
    ///
    /// With `App\\` → `app/`, `App\Controllers\Home` gives
    /// `app/Controllers/Home.php`. Longer prefixes come first.
    pub fn resolve_class_to_paths(&self, fqn: &str) -> Vec<String> {
        let fqn = fqn.trim_start_matches('\\');
        let mut matches: Vec<(&str, &Vec<String>)> = self
            .psr4
            .iter()
            .filter(|(prefix, _)| fqn.starts_with(prefix.as_str()))
            .map(|(prefix, dirs)| (prefix.as_str(), dirs))
            .collect();
        matches.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut results = Vec::new();
        for (prefix, dirs) in matches {
            let relative = fqn[prefix.len()..].replace('\\', "/") + ".php";
            for dir in dirs {
                results.push(join(dir.trim_matches('/'), &relative));
            }
        }
        results
    }
}

#[derive(Debug, Deserialize, Default)]
struct ComposerJson {
    #[serde(default)]
    require: HashMap<String, serde_json::Value>,
    #[serde(default, rename = "require-dev")]
    require_dev: HashMap<String, serde_json::Value>,
    #[serde(default)]
    autoload: AutoloadSection,
    #[serde(default, rename = "autoload-dev")]
    autoload_dev: AutoloadSection,
}

#[derive(Debug, Deserialize, Default)]
struct AutoloadSection {
    #[serde(default, rename = "psr-4")]
    psr4: HashMap<String, Psr4Value>,
}

/// PSR-4 value can be a string or array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Psr4Value {
    Single(String),
    Multiple(Vec<String>),
}

impl Psr4Value {
    fn to_dirs(&self) -> Vec<String> {
        match self {
            Psr4Value::Single(s) => vec![normalize_dir(s)],
            Psr4Value::Multiple(v) => v.iter().map(|s| normalize_dir(s)).collect(),
        }
    }
}

fn normalize_dir(dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    let dir = dir.strip_prefix("./").unwrap_or(&dir);
    dir.trim_matches('/').to_string()
}

/// Read `composer.json` from disk.
pub fn parse_composer_json(path: &Path) -> IndexResult<ComposerManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    parse_composer_json_str(&content)
}

/// Parse composer.json content.
pub fn parse_composer_json_str(content: &str) -> IndexResult<ComposerManifest> {
    let composer: ComposerJson = serde_json::from_str(content)?;

    let requires_framework = composer.require.contains_key(FRAMEWORK_PACKAGE)
        || composer.require_dev.contains_key(FRAMEWORK_PACKAGE);

    let mut psr4 = Vec::new();
    for section in [&composer.autoload, &composer.autoload_dev] {
        for (prefix, value) in &section.psr4 {
            psr4.push((prefix.clone(), value.to_dirs()));
        }
    }
    psr4.sort();

    Ok(ComposerManifest {
        requires_framework,
        psr4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_framework_requirement() {
        let json = r#"{
            "require": {
                "php": ">=8.2",
                "phphleb/framework": "^2.0"
            }
        }"#;
        let manifest = parse_composer_json_str(json).unwrap();
        assert!(manifest.requires_framework);

        let dev = r#"{ "require-dev": { "phphleb/framework": "dev-master" } }"#;
        assert!(parse_composer_json_str(dev).unwrap().requires_framework);

        let other = r#"{ "require": { "laravel/framework": "^11.0" } }"#;
        assert!(!parse_composer_json_str(other).unwrap().requires_framework);
    }

    #[test]
    fn test_parse_psr4_with_dev() {
        let json = r#"{
            "autoload": { "psr-4": { "App\\": "app/" } },
            "autoload-dev": { "psr-4": { "App\\Tests\\": ["tests/", "./more-tests"] } }
        }"#;
        let manifest = parse_composer_json_str(json).unwrap();
        assert_eq!(
            manifest.psr4,
            vec![
                ("App\\".to_string(), vec!["app".to_string()]),
                (
                    "App\\Tests\\".to_string(),
                    vec!["tests".to_string(), "more-tests".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_resolve_controller_class() {
        let json = r#"{
            "autoload": { "psr-4": { "App\\": "app/", "Modules\\": "modules/" } }
        }"#;
        let manifest = parse_composer_json_str(json).unwrap();
        assert_eq!(
            manifest.resolve_class_to_paths("\\App\\Controllers\\DefaultController"),
            vec!["app/Controllers/DefaultController.php"]
        );
        assert!(manifest.resolve_class_to_paths("Vendor\\X").is_empty());
    }

    #[test]
    fn test_longest_prefix_first() {
        let json = r#"{
            "autoload": { "psr-4": { "App\\": "app/", "App\\Tests\\": "tests/" } }
        }"#;
        let manifest = parse_composer_json_str(json).unwrap();
        assert_eq!(
            manifest.resolve_class_to_paths("App\\Tests\\HomeTest"),
            vec!["tests/HomeTest.php", "app/Tests/HomeTest.php"]
        );
    }

    #[test]
    fn test_empty_and_invalid() {
        let manifest = parse_composer_json_str("{}").unwrap();
        assert!(!manifest.requires_framework);
        assert!(manifest.psr4.is_empty());

        assert!(matches!(
            parse_composer_json_str("{ not json"),
            Err(IndexError::Composer(_))
        ));
    }
}
