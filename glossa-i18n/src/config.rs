//! Engine configuration
//!
//! Loaded once at startup from defaults, an optional `.toml`/`.json` file,
//! and `GLOSSA_*` environment overrides.

use crate::locale::builtin_locales;
use crate::{I18nError, LocaleConfig, LocaleId, LocaleRegistry, Result, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Locale picker markup conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Class carried by every picker button
    pub class: String,
    /// Attribute holding the button's locale id
    pub attribute: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            class: "locale-flag".to_string(),
            attribute: "data-lang".to_string(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    pub default_locale: LocaleId,
    pub locales: Vec<LocaleConfig>,
    /// Dictionaries are fetched from `<dictionary_base_url>/<locale>.json`.
    /// The built-in HTTP source needs an absolute URL; the relative default
    /// only works with a source that resolves it against the page origin.
    pub dictionary_base_url: String,
    /// Preference key the chosen locale is persisted under
    pub storage_key: String,
    /// Reconciler debounce window in milliseconds
    pub debounce_ms: u64,
    pub picker: PickerConfig,
    pub retry: RetryPolicy,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: LocaleId::new("en"),
            locales: builtin_locales(),
            dictionary_base_url: "/i18n".to_string(),
            storage_key: "glossa_locale".to_string(),
            debounce_ms: 75,
            picker: PickerConfig::default(),
            retry: RetryPolicy::none(),
        }
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

impl I18nConfig {
    /// Load a config file, detecting the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| I18nError::Config(format!("No file extension: {}", path.display())))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| I18nError::Config(format!("Unsupported format: {}", ext)))?;

        let content = fs::read_to_string(path)?;
        match format {
            FileFormat::Json => Self::from_json_str(&content),
            FileFormat::Toml => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Apply `GLOSSA_DEFAULT_LOCALE`, `GLOSSA_DICTIONARY_BASE_URL`,
    /// `GLOSSA_DEBOUNCE_MS` and `GLOSSA_STORAGE_KEY`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(default) = lookup("GLOSSA_DEFAULT_LOCALE") {
            self.default_locale = LocaleId::new(default);
        }
        if let Some(url) = lookup("GLOSSA_DICTIONARY_BASE_URL") {
            self.dictionary_base_url = url;
        }
        if let Some(ms) = lookup("GLOSSA_DEBOUNCE_MS") {
            self.debounce_ms = ms.trim().parse().map_err(|_| {
                I18nError::Config(format!("GLOSSA_DEBOUNCE_MS is not a number: {}", ms))
            })?;
        }
        if let Some(key) = lookup("GLOSSA_STORAGE_KEY") {
            self.storage_key = key;
        }
        Ok(self)
    }

    /// Check the locale set and scalar settings.
    pub fn validate(&self) -> Result<()> {
        self.registry()?;
        if self.storage_key.trim().is_empty() {
            return Err(I18nError::Config("storage_key must not be empty".to_string()));
        }
        if self.picker.class.trim().is_empty() || self.picker.attribute.trim().is_empty() {
            return Err(I18nError::Config("picker class and attribute must not be empty".to_string()));
        }
        Ok(())
    }

    /// The immutable locale registry described by this config.
    pub fn registry(&self) -> Result<LocaleRegistry> {
        LocaleRegistry::new(self.default_locale.clone(), self.locales.clone())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = I18nConfig::default();
        config.validate().unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(75));
        assert_eq!(config.registry().unwrap().len(), 6);
    }

    #[test]
    fn test_toml_config() {
        let config = I18nConfig::from_toml_str(
            r#"
            default_locale = "en"
            dictionary_base_url = "https://cdn.example.org/i18n"
            debounce_ms = 120

            [[locales]]
            id = "en"
            label = "English"
            glyph = "🇬🇧"

            [[locales]]
            id = "ar"
            tag = "ar-SA"
            rtl = true
            label = "العربية"

            [picker]
            class = "lang-btn"

            [retry]
            max_retries = 1
            backoff = { strategy = "constant", delay = 200 }
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        let registry = config.registry().unwrap();
        assert!(registry.get("ar").unwrap().rtl);
        assert_eq!(config.picker.class, "lang-btn");
        assert_eq!(config.picker.attribute, "data-lang");
        assert_eq!(config.storage_key, "glossa_locale");
        assert_eq!(config.retry, RetryPolicy::constant(1, Duration::from_millis(200)));
    }

    #[test]
    fn test_json_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("i18n.json");
        fs::write(&path, r#"{"default_locale": "fr", "storage_key": "lang"}"#).unwrap();

        let config = I18nConfig::from_file(&path).unwrap();
        assert_eq!(config.default_locale, "fr");
        assert_eq!(config.storage_key, "lang");
        config.validate().unwrap();

        let unsupported = dir.path().join("i18n.yaml");
        fs::write(&unsupported, "x: 1").unwrap();
        assert!(matches!(I18nConfig::from_file(&unsupported), Err(I18nError::Config(_))));
    }

    #[test]
    fn test_invalid_default_rejected() {
        let config = I18nConfig {
            default_locale: LocaleId::new("pt"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GLOSSA_DEFAULT_LOCALE", "DE"),
            ("GLOSSA_DEBOUNCE_MS", " 10 "),
            ("GLOSSA_STORAGE_KEY", "nh_lang"),
        ]
        .into_iter()
        .collect();

        let config = I18nConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.default_locale, "de");
        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.storage_key, "nh_lang");
        assert_eq!(config.dictionary_base_url, "/i18n");

        let bad = I18nConfig::default().with_overrides(|name| {
            (name == "GLOSSA_DEBOUNCE_MS").then(|| "soon".to_string())
        });
        assert!(matches!(bad, Err(I18nError::Config(_))));
    }
}
