//! Memoized dictionary loading with default-locale fallback

use crate::{Dictionary, DictionarySource, LocaleId, Result};
use glossa_log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<Dictionary>>>;

/// Session-lifetime dictionary cache in front of a [`DictionarySource`].
///
/// Each locale has one slot; concurrent loads of the same uncached locale
/// wait on the slot, so at most one fetch is in flight per locale. Successful
/// loads are never evicted. Failed loads leave the slot empty and are retried
/// by the next caller.
pub struct DictionaryStore {
    source: Arc<dyn DictionarySource>,
    default: LocaleId,
    slots: Mutex<HashMap<LocaleId, Slot>>,
}

impl DictionaryStore {
    pub fn new(source: Arc<dyn DictionarySource>, default: impl Into<LocaleId>) -> Self {
        Self {
            source,
            default: default.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_locale(&self) -> &LocaleId {
        &self.default
    }

    /// Dictionary for `locale`, degrading instead of failing.
    ///
    /// A failed non-default load yields the default locale's dictionary; a
    /// failed default load yields an empty dictionary, which is not cached.
    pub async fn load(&self, locale: &LocaleId) -> Arc<Dictionary> {
        if *locale != self.default {
            match self.try_load(locale).await {
                Ok(dictionary) => return dictionary,
                Err(err) => {
                    warn!(
                        target: "glossa::store",
                        "Falling back to {} after failing to load {}: {}",
                        self.default, locale, err
                    );
                }
            }
        }

        match self.try_load(&self.default).await {
            Ok(dictionary) => dictionary,
            Err(err) => {
                warn!(target: "glossa::store", "Unable to load language dictionaries: {}", err);
                Arc::new(Dictionary::empty())
            }
        }
    }

    /// Load `locale` without fallback, populating the cache on success.
    pub async fn try_load(&self, locale: &LocaleId) -> Result<Arc<Dictionary>> {
        let slot = self.slot(locale);
        let dictionary = slot
            .get_or_try_init(|| async {
                debug!(target: "glossa::store", "Fetching dictionary for {}", locale);
                let dictionary = self.source.fetch(locale).await?;
                debug!(target: "glossa::store", "Loaded dictionary for {}", locale);
                Ok::<_, crate::I18nError>(Arc::new(dictionary))
            })
            .await?;
        Ok(Arc::clone(dictionary))
    }

    /// The cached dictionary for `locale`, without fetching.
    pub fn get(&self, locale: &LocaleId) -> Option<Arc<Dictionary>> {
        self.slots
            .lock()
            .get(locale)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn is_cached(&self, locale: &LocaleId) -> bool {
        self.get(locale).is_some()
    }

    /// Locales with a completed cache entry, sorted.
    pub fn cached_locales(&self) -> Vec<LocaleId> {
        let mut locales: Vec<LocaleId> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(locale, _)| locale.clone())
            .collect();
        locales.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        locales
    }

    fn slot(&self, locale: &LocaleId) -> Slot {
        Arc::clone(self.slots.lock().entry(locale.clone()).or_default())
    }
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("default", &self.default)
            .field("cached", &self.cached_locales())
            .finish()
    }
}
