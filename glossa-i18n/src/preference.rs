//! Persisted locale preference

use crate::{I18nError, Result};
use glossa_log::warn;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Key-value storage surviving the session (the browser's `localStorage` role).
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `key` already set, as if persisted by an earlier session.
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.write().insert(key.into(), value.into());
        self
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences stored as a flat JSON object in a file.
///
/// Writes go to a sibling temp file that is then renamed over the target.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(I18nError::Config(format!("{:?} does not hold a JSON object", self.path))),
        }
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(map) => map.get(key).and_then(Value::as_str).map(str::to_string),
            Err(err) => {
                warn!(target: "glossa::preference", "Ignoring unreadable preferences {:?}: {}", self.path, err);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_all().unwrap_or_else(|err| {
            warn!(target: "glossa::preference", "Replacing unreadable preferences {:?}: {}", self.path, err);
            Map::new()
        });
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_preferences() {
        let prefs = MemoryPreferences::new().with("glossa_locale", "fr");
        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("fr"));

        prefs.set("glossa_locale", "de").unwrap();
        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("de"));
        assert_eq!(prefs.get("other"), None);
    }

    #[test]
    fn test_file_preferences_roundtrip_and_preserve_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let prefs = FilePreferences::new(&path);
        assert_eq!(prefs.get("glossa_locale"), None);

        prefs.set("glossa_locale", "ja").unwrap();
        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("ja"));
        assert_eq!(prefs.get("theme").as_deref(), Some("dark"));

        // A second store over the same file sees the persisted value.
        let reopened = FilePreferences::new(&path);
        assert_eq!(reopened.get("glossa_locale").as_deref(), Some("ja"));
    }

    #[test]
    fn test_file_preferences_tolerate_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        let prefs = FilePreferences::new(&path);
        assert_eq!(prefs.get("glossa_locale"), None);
        prefs.set("glossa_locale", "es").unwrap();
        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("es"));
    }

    #[test]
    fn test_replacing_unreadable_preferences_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[\"not\", \"an object\"]").unwrap();
        let shown = format!("{:?}", path);

        let replaced: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&replaced);
        let expected = shown.clone();
        glossa_log::install_sink(Arc::new(move |record: &glossa_log::Record<'_>| {
            if record.target == "glossa::preference" && record.message.contains(&expected) {
                sink.lock().push(record.message.to_string());
            }
        }));

        let prefs = FilePreferences::new(&path);
        prefs.set("glossa_locale", "fr").unwrap();
        glossa_log::clear_sink();

        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("fr"));
        let replaced = replaced.lock();
        assert_eq!(replaced.len(), 1);
        assert!(replaced[0].starts_with("Replacing unreadable preferences"));
    }
}
