//! Live Document Localization for Glossa
//!
//! Translates a live, mutating [`Document`](glossa_dom::Document) into a
//! user-selected language:
//!
//! - **Locale Resolution**: persisted preference, path hint, browser languages, default
//! - **Dictionaries**: fetched once per locale, with default-locale fallback
//! - **Translation**: dotted key lookup with `{name}` interpolation
//! - **Applier**: writes text, markup and attributes for `data-i18n*` markers
//! - **Reconciler**: debounced re-application to inserted content
//! - **Locale Switch**: persist, load, update `lang`/`dir`, re-apply, notify
//!
//! # Quick Start
//!
//! ```rust
//! use glossa_i18n::{I18n, MemorySource, Navigation};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> glossa_i18n::Result<()> {
//! let source = MemorySource::new()
//!     .with_dictionary("en", json!({"greeting": "Hi {name}"}))
//!     .with_dictionary("fr", json!({"greeting": "Salut {name}"}));
//!
//! let engine = I18n::builder().source(Arc::new(source)).build()?;
//! engine.init(Navigation::path("/fr/")).await?;
//!
//! let args = glossa_i18n::Args::new().with("name", "Ada");
//! assert_eq!(engine.translate("greeting", Some(&args)), "Salut Ada");
//! assert_eq!(engine.t("missing.key"), "missing.key");
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Model
//!
//! Nothing on the translation surface fails: an unavailable dictionary
//! degrades to the default locale, then to an empty dictionary, and a missing
//! key renders as the key itself. Only construction (config, builder,
//! starting the reconciler outside a runtime) returns errors.

mod applier;
pub mod audit;
mod config;
mod coordinator;
mod dictionary;
mod error;
mod locale;
mod picker;
mod preference;
mod reconciler;
mod resolver;
mod session;
mod source;
mod store;

pub use applier::{ATTR_MARKER, Applier, ApplyReport, HTML_MARKER, TEXT_MARKER, attribute_sub_key};
pub use config::{FileFormat, I18nConfig, PickerConfig};
pub use coordinator::{I18n, I18nBuilder, LocaleCallback, Navigation, RTL_CLASS, SubscriptionId};
pub use dictionary::{ArgValue, Args, Dictionary, interpolate};
pub use error::I18nError;
pub use locale::{
    Locale, LocaleConfig, LocaleId, LocaleRegistry, TextDirection, negotiate_locale,
    parse_accept_language,
};
pub use picker::{ACTIVE_CLASS, BOUND_MARKER, LocalePicker, SelectHandler};
pub use preference::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use reconciler::{Reconciler, ReconcilerState, ReconcilerStats};
pub use resolver::{LocaleResolver, path_hint};
pub use session::{ApplyGuard, Session};
pub use source::{BackoffStrategy, DictionarySource, HttpSource, MemorySource, RetryPolicy};
pub use store::DictionaryStore;

/// Result type for i18n operations
pub type Result<T> = std::result::Result<T, I18nError>;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Args, Dictionary, DictionarySource, I18n, I18nConfig, I18nError, LocaleId, MemorySource,
        Navigation, PreferenceStore, Result,
    };
}
