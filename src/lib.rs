// Glossa - live document localization for Rust
//
// Translates a mutating document tree into a user-selected language: dictionaries
// are loaded once per locale with default-locale fallback, marked elements are
// rewritten in place, and inserted content is reconciled after a short debounce.

// Re-export the engine
pub use glossa_i18n::*;

// Re-export member crates
pub use glossa_dom as dom;
pub use glossa_i18n as i18n;
pub use glossa_log as log;

pub use glossa_dom::{Document, NodeId};

// Re-export what dictionary sources are written with
pub use async_trait::async_trait;
pub use serde_json::{Value, json};

/// Start-up helper: read `GLOSSA_*` logging settings and route `log` records
/// through the same output.
///
/// Safe to call more than once; only the first bridge installation takes effect.
pub fn init_logging() {
    glossa_log::init();
    let _ = glossa_log::init_log_bridge();
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Args, Dictionary, DictionarySource, Document, I18n, I18nConfig, I18nError, LocaleId,
        MemoryPreferences, MemorySource, Navigation, NodeId, PreferenceStore, Result, async_trait,
        json,
    };
}
