//! The localization engine and its locale switch

use crate::{
    Applier, ApplyReport, Args, DictionarySource, DictionaryStore, HttpSource, I18nConfig,
    I18nError, LocaleConfig, LocaleId, LocalePicker, LocaleRegistry, LocaleResolver,
    MemoryPreferences, PreferenceStore, Reconciler, Result, Session,
};
use glossa_dom::{Document, NodeId};
use glossa_log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;

/// Class toggled on the document element for right-to-left locales.
pub const RTL_CLASS: &str = "rtl";

/// Callback invoked after every committed locale switch.
pub type LocaleCallback = Arc<dyn Fn(&LocaleId) + Send + Sync>;

/// Identifies a locale change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Where the page was loaded from, used to pick the initial locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    /// Browser language preferences, consulted after the path hint
    pub accept_language: Option<String>,
}

impl Navigation {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            accept_language: None,
        }
    }

    pub fn with_accept_language(mut self, header: impl Into<String>) -> Self {
        self.accept_language = Some(header.into());
        self
    }
}

struct Inner {
    document: Document,
    config: I18nConfig,
    registry: Arc<LocaleRegistry>,
    session: Arc<Session>,
    applier: Applier,
    picker: LocalePicker,
    preferences: Arc<dyn PreferenceStore>,
    subscribers: RwLock<Vec<(SubscriptionId, LocaleCallback)>>,
    next_subscription: AtomicU64,
    reconciler: Mutex<Option<Reconciler>>,
}

/// A localization engine bound to one document.
///
/// Cloning is cheap; clones share the session, cache and subscribers.
/// Separate engines never share state.
///
/// ```no_run
/// use glossa_i18n::{I18n, I18nConfig, Navigation};
///
/// # async fn run() -> glossa_i18n::Result<()> {
/// let config = I18nConfig {
///     dictionary_base_url: "https://example.org/i18n".to_string(),
///     ..Default::default()
/// };
/// let engine = I18n::builder().config(config).build()?;
/// engine.init(Navigation::path("/fr/")).await?;
/// println!("{}", engine.t("common.language"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct I18n {
    inner: Arc<Inner>,
}

impl I18n {
    pub fn builder() -> I18nBuilder {
        I18nBuilder::default()
    }

    /// Resolve the initial locale, switch to it, then start reconciling
    /// inserted content.
    pub async fn init(&self, navigation: Navigation) -> Result<()> {
        let inner = &self.inner;
        let preference = inner.preferences.get(&inner.config.storage_key);
        let mut resolver = LocaleResolver::new(&inner.registry)
            .with_preference(preference)
            .with_path(navigation.path);
        if let Some(header) = navigation.accept_language {
            resolver = resolver.with_accept_language(header);
        }
        let locale = resolver.resolve();
        info!(target: "glossa::engine", "Initial locale {}", locale);

        self.set_locale(locale.as_str()).await;
        self.start_reconciler()?;
        Ok(())
    }

    /// Start the reconciler if it is not running yet.
    pub fn start_reconciler(&self) -> Result<Reconciler> {
        let inner = &self.inner;
        let mut slot = inner.reconciler.lock();
        if let Some(reconciler) = slot.as_ref().filter(|r| r.is_observing()) {
            return Ok(reconciler.clone());
        }
        let reconciler = Reconciler::start(
            &inner.document,
            Arc::clone(&inner.session),
            inner.applier.clone(),
            inner.config.debounce(),
        )?;
        *slot = Some(reconciler.clone());
        Ok(reconciler)
    }

    /// Switch the active locale.
    ///
    /// Unsupported ids switch to the default locale. The choice is persisted
    /// before the dictionary loads. When several switches overlap, only the
    /// most recently started one commits; the others just warm the cache.
    pub async fn set_locale(&self, locale: &str) {
        let inner = &self.inner;
        let config = inner
            .registry
            .get(locale)
            .unwrap_or_else(|| inner.registry.default_config())
            .clone();
        let ticket = inner.session.begin_switch();
        debug!(target: "glossa::engine", "Switching to {} (requested {:?})", config.id, locale);

        if let Err(err) = inner.preferences.set(&inner.config.storage_key, config.id.as_str()) {
            warn!(target: "glossa::engine", "Failed to persist locale {}: {}", config.id, err);
        }

        let store = inner.session.store();
        let dictionary = store.load(&config.id).await;
        store.load(inner.registry.default_locale()).await;

        if !inner.session.commit_if_current(ticket, config.id.clone(), dictionary) {
            debug!(target: "glossa::engine", "Switch to {} superseded", config.id);
            return;
        }

        self.update_document_locale(&config);
        inner.applier.apply(&inner.document, inner.document.root());
        self.bind_picker();
        inner.picker.sync_active(&inner.document, &config.id);
        self.notify(&config.id);
    }

    pub fn locale(&self) -> LocaleId {
        self.inner.session.locale()
    }

    /// Translate `key`, substituting `{name}` placeholders from `args`.
    ///
    /// Falls back to the default locale, then to the key itself.
    pub fn translate(&self, key: &str, args: Option<&Args>) -> String {
        self.inner.session.translate(key, args)
    }

    /// Translate `key` without arguments.
    pub fn t(&self, key: &str) -> String {
        self.translate(key, None)
    }

    /// Register `callback` to run after each committed switch, in
    /// registration order.
    pub fn on_locale_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LocaleId) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription; returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Apply the active translations at or beneath `root`.
    pub fn apply(&self, root: NodeId) -> ApplyReport {
        self.inner.applier.apply(&self.inner.document, root)
    }

    pub fn reconciler(&self) -> Option<Reconciler> {
        self.inner.reconciler.lock().clone()
    }

    pub fn dictionary_store(&self) -> &Arc<DictionaryStore> {
        self.inner.session.store()
    }

    pub fn registry(&self) -> &LocaleRegistry {
        &self.inner.registry
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn config(&self) -> &I18nConfig {
        &self.inner.config
    }

    /// Stop the reconciler; translation and switching keep working.
    pub fn shutdown(&self) {
        if let Some(reconciler) = self.inner.reconciler.lock().take() {
            reconciler.shutdown();
        }
    }

    fn update_document_locale(&self, config: &LocaleConfig) {
        let document = &self.inner.document;
        let html = document.document_element();
        let result = document
            .set_attribute(html, "lang", config.html_lang())
            .and_then(|_| document.set_attribute(html, "dir", config.direction().as_str()))
            .and_then(|_| document.toggle_class(html, RTL_CLASS, config.rtl));
        if let Err(err) = result {
            warn!(target: "glossa::engine", "Failed to update document locale: {}", err);
        }
    }

    fn bind_picker(&self) {
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        self.inner.picker.bind(
            &self.inner.document,
            Arc::new(move |locale: LocaleId| {
                if let Some(inner) = weak.upgrade() {
                    let engine = I18n { inner };
                    runtime.spawn(async move { engine.set_locale(locale.as_str()).await });
                }
            }),
        );
    }

    fn notify(&self, locale: &LocaleId) {
        let subscribers: Vec<LocaleCallback> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in subscribers {
            callback(locale);
        }
    }
}

impl fmt::Debug for I18n {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I18n")
            .field("locale", &self.locale())
            .field("default", self.inner.registry.default_locale())
            .field("subscribers", &self.inner.subscribers.read().len())
            .finish()
    }
}

/// Builder for [`I18n`].
///
/// Unset parts default to a fresh document, [`I18nConfig::default`], an
/// [`HttpSource`] at the configured base URL, and in-memory preferences.
/// Without an explicit source the base URL must be absolute.
#[derive(Default)]
pub struct I18nBuilder {
    document: Option<Document>,
    config: Option<I18nConfig>,
    source: Option<Arc<dyn DictionarySource>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl I18nBuilder {
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn config(mut self, config: I18nConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn source(mut self, source: Arc<dyn DictionarySource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn build(self) -> Result<I18n> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let registry = Arc::new(config.registry()?);

        let source = match self.source {
            Some(source) => source,
            None => {
                reqwest::Url::parse(&config.dictionary_base_url).map_err(|err| {
                    I18nError::Config(format!(
                        "dictionary_base_url {:?} must be an absolute URL when no source is given: {}",
                        config.dictionary_base_url, err
                    ))
                })?;
                Arc::new(HttpSource::new(config.dictionary_base_url.clone()).with_retry(config.retry.clone()))
            }
        };
        let store = Arc::new(DictionaryStore::new(source, registry.default_locale().clone()));
        let session = Arc::new(Session::new(store));

        Ok(I18n {
            inner: Arc::new(Inner {
                document: self.document.unwrap_or_default(),
                picker: LocalePicker::from_config(&config.picker),
                applier: Applier::new(Arc::clone(&session)),
                preferences: self
                    .preferences
                    .unwrap_or_else(|| Arc::new(MemoryPreferences::new())),
                subscribers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                reconciler: Mutex::new(None),
                registry,
                session,
                config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;
    use serde_json::json;

    fn engine(preferences: Arc<MemoryPreferences>) -> I18n {
        let source = MemorySource::new()
            .with_dictionary("en", json!({"common": {"language": "Language"}}))
            .with_dictionary("fr", json!({"common": {"language": "Langue"}}));
        I18n::builder()
            .source(Arc::new(source))
            .preferences(preferences)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_switch_persists_and_notifies_in_order() {
        let prefs = Arc::new(MemoryPreferences::new());
        let engine = engine(Arc::clone(&prefs));

        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            engine.on_locale_change(move |id| seen.lock().push(format!("{tag}:{id}")));
        }

        engine.set_locale("fr").await;
        assert_eq!(engine.locale(), "fr");
        assert_eq!(engine.t("common.language"), "Langue");
        assert_eq!(prefs.get("glossa_locale").as_deref(), Some("fr"));
        assert_eq!(*seen.lock(), vec!["first:fr", "second:fr"]);
    }

    #[tokio::test]
    async fn test_unsupported_locale_uses_default() {
        let engine = engine(Arc::new(MemoryPreferences::new()));
        engine.set_locale("fr").await;
        engine.set_locale("klingon").await;
        assert_eq!(engine.locale(), "en");
        assert_eq!(engine.t("common.language"), "Language");
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let engine = engine(Arc::new(MemoryPreferences::new()));
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let id = engine.on_locale_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.set_locale("fr").await;
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.set_locale("en").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_document_metadata() {
        let mut config = I18nConfig::default();
        config
            .locales
            .push(LocaleConfig::new("ar", "العربية", "").with_tag("ar-SA").right_to_left());
        let engine = I18n::builder()
            .config(config)
            .source(Arc::new(MemorySource::new()))
            .build()
            .unwrap();
        let html = engine.document().document_element();

        engine.set_locale("ar").await;
        assert_eq!(engine.document().get_attribute(html, "lang").as_deref(), Some("ar-SA"));
        assert_eq!(engine.document().get_attribute(html, "dir").as_deref(), Some("rtl"));
        assert!(engine.document().has_class(html, RTL_CLASS));

        engine.set_locale("zh").await;
        assert_eq!(engine.document().get_attribute(html, "lang").as_deref(), Some("zh-Hans"));
        assert_eq!(engine.document().get_attribute(html, "dir").as_deref(), Some("ltr"));
        assert!(!engine.document().has_class(html, RTL_CLASS));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = I18nConfig {
            locales: Vec::new(),
            ..Default::default()
        };
        assert!(I18n::builder().config(config).build().is_err());
    }

    #[test]
    fn test_builder_requires_absolute_base_url_for_http() {
        let result = I18n::builder().build();
        assert!(matches!(result, Err(I18nError::Config(message)) if message.contains("/i18n")));

        let config = I18nConfig {
            dictionary_base_url: "https://example.org/i18n".to_string(),
            ..Default::default()
        };
        assert!(I18n::builder().config(config).build().is_ok());

        let relative_with_source = I18n::builder().source(Arc::new(MemorySource::new())).build();
        assert!(relative_with_source.is_ok());
    }
}
