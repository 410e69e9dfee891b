//! Initial locale resolution

use crate::locale::{negotiate_locale, parse_accept_language};
use crate::{LocaleId, LocaleRegistry};

/// Picks the locale a session starts in.
///
/// Precedence: a supported persisted preference, then a supported locale
/// named by the first navigation path segment, then (when supplied) the
/// best match for an `Accept-Language` header, then the default. Every
/// unsupported or malformed hint is skipped, so resolution always yields a
/// supported id.
///
/// ```
/// use glossa_i18n::{LocaleRegistry, LocaleResolver};
///
/// let registry = LocaleRegistry::builtin();
/// let locale = LocaleResolver::new(&registry)
///     .with_preference(Some("xx"))
///     .with_path("/fr/pricing")
///     .resolve();
/// assert_eq!(locale, "fr");
/// ```
#[derive(Debug, Clone)]
pub struct LocaleResolver<'a> {
    registry: &'a LocaleRegistry,
    preference: Option<String>,
    path: Option<String>,
    accept_language: Option<String>,
}

impl<'a> LocaleResolver<'a> {
    pub fn new(registry: &'a LocaleRegistry) -> Self {
        Self {
            registry,
            preference: None,
            path: None,
            accept_language: None,
        }
    }

    /// The value persisted by an earlier session, if any.
    pub fn with_preference(mut self, preference: Option<impl Into<String>>) -> Self {
        self.preference = preference.map(Into::into);
        self
    }

    /// Current navigation path, e.g. `/es/about`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_accept_language(mut self, header: impl Into<String>) -> Self {
        self.accept_language = Some(header.into());
        self
    }

    pub fn resolve(&self) -> LocaleId {
        self.from_preference()
            .or_else(|| self.from_path())
            .or_else(|| self.from_accept_language())
            .unwrap_or_else(|| self.registry.default_locale().clone())
    }

    fn from_preference(&self) -> Option<LocaleId> {
        let preference = self.preference.as_deref()?;
        self.registry.get(preference).map(|l| l.id.clone())
    }

    fn from_path(&self) -> Option<LocaleId> {
        path_hint(self.path.as_deref()?, self.registry)
    }

    fn from_accept_language(&self) -> Option<LocaleId> {
        let header = self.accept_language.as_deref()?;
        negotiate_locale(&parse_accept_language(header), self.registry)
    }
}

/// Supported locale named by the first segment of `path`.
///
/// Only `/<id>` and `/<id>/...` match; the default locale is served from the
/// unprefixed root and is never a path hint.
pub fn path_hint(path: &str, registry: &LocaleRegistry) -> Option<LocaleId> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.strip_prefix('/')?.split('/').next()?;
    if segment.is_empty() || segment != segment.to_lowercase() {
        return None;
    }
    registry
        .get(segment)
        .map(|l| l.id.clone())
        .filter(|id| id != registry.default_locale())
}
