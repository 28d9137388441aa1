//! Client settings from `initializationOptions` and
//! `workspace/didChangeConfiguration`.

use serde::Deserialize;
use serde_json::Value;

/// Key the settings may be nested under.
const SECTION: &str = "hleb2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Language segment of documentation links (`en`, `ru`).
    pub docs_language: String,
    /// Enable framework features without detecting an HLEB2 project.
    pub force_enable: bool,
    /// Publish hints for debugging function calls.
    pub debug_hints: bool,
    /// Cap on path and view completion items.
    pub max_path_variants: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            docs_language: "en".to_string(),
            force_enable: false,
            debug_hints: true,
            max_path_variants: 500,
        }
    }
}

impl Settings {
    /// Read settings from a client JSON value, either under `hleb2` or at the
    /// top level. Invalid values fall back to the defaults.
    pub fn from_value(value: &Value) -> Self {
        let section = value.get(SECTION).unwrap_or(value);
        if section.is_null() {
            return Settings::default();
        }
        match serde_json::from_value::<Settings>(section.clone()) {
            Ok(mut settings) => {
                if settings.docs_language.trim().is_empty() {
                    settings.docs_language = Settings::default().docs_language;
                }
                settings
            }
            Err(e) => {
                tracing::warn!("Invalid hleb2 settings, using defaults: {}", e);
                Settings::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_value(&Value::Null);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.docs_language, "en");
        assert!(settings.debug_hints);
        assert_eq!(settings.max_path_variants, 500);
    }

    #[test]
    fn test_nested_section() {
        let settings = Settings::from_value(&json!({
            "hleb2": { "docsLanguage": "ru", "forceEnable": true }
        }));
        assert_eq!(settings.docs_language, "ru");
        assert!(settings.force_enable);
        assert!(settings.debug_hints);
    }

    #[test]
    fn test_top_level() {
        let settings = Settings::from_value(&json!({
            "debugHints": false,
            "maxPathVariants": 20
        }));
        assert!(!settings.debug_hints);
        assert_eq!(settings.max_path_variants, 20);
    }

    #[test]
    fn test_invalid_falls_back() {
        let settings = Settings::from_value(&json!({ "maxPathVariants": "many" }));
        assert_eq!(settings, Settings::default());
        let settings = Settings::from_value(&json!({ "docsLanguage": "" }));
        assert_eq!(settings.docs_language, "en");
    }
}
