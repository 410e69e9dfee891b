//! Error types for i18n operations
//!
//! None of these reach callers of the engine's translation surface: load
//! failures degrade to the default locale and missing keys echo the key.

use thiserror::Error;

/// Errors that can occur while configuring the engine or loading dictionaries.
#[derive(Debug, Error)]
pub enum I18nError {
    /// Invalid locale id or language tag
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    /// The dictionary resource answered with a non-success status
    #[error("Failed to load dictionary for {locale}: HTTP {status}")]
    Fetch { locale: String, status: u16 },

    /// The dictionary request never produced a response
    #[error("Transport error loading dictionary for {locale}: {message}")]
    Transport { locale: String, message: String },

    /// The dictionary payload is not a JSON object
    #[error("Malformed dictionary for {locale}: {message}")]
    MalformedDictionary { locale: String, message: String },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parse error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Document operation failed
    #[error("Document error: {0}")]
    Dom(#[from] glossa_dom::DomError),

    /// A timer-driven component was started outside a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),
}

impl I18nError {
    /// Whether this error is a dictionary load failure (network, status, or payload).
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Transport { .. } | Self::MalformedDictionary { .. }
        )
    }
}
