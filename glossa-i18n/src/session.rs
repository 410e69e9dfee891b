//! Active session state: current locale, its dictionary, and the apply guard

use crate::{Args, Dictionary, DictionaryStore, LocaleId, interpolate};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

#[derive(Debug, Clone)]
struct Active {
    locale: LocaleId,
    dictionary: Arc<Dictionary>,
}

/// State owned by one engine instance.
///
/// The locale id and dictionary are swapped together, so readers never see
/// one without the other. Until the first switch commits, the session reports
/// the default locale with an empty dictionary.
#[derive(Debug)]
pub struct Session {
    active: RwLock<Active>,
    /// Open apply guards per thread
    applying: Mutex<HashMap<ThreadId, usize>>,
    generation: AtomicU64,
    store: Arc<DictionaryStore>,
}

impl Session {
    pub fn new(store: Arc<DictionaryStore>) -> Self {
        let locale = store.default_locale().clone();
        Self {
            active: RwLock::new(Active {
                locale,
                dictionary: Arc::new(Dictionary::empty()),
            }),
            applying: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            store,
        }
    }

    pub fn locale(&self) -> LocaleId {
        self.active.read().locale.clone()
    }

    pub fn dictionary(&self) -> Arc<Dictionary> {
        Arc::clone(&self.active.read().dictionary)
    }

    pub fn store(&self) -> &Arc<DictionaryStore> {
        &self.store
    }

    /// Resolve `key` in the active dictionary, then in the cached default one.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let active = self.dictionary();
        if let Some(value) = active.resolve(key) {
            return Some(value.to_string());
        }
        self.store
            .get(self.store.default_locale())
            .and_then(|default| default.resolve(key).map(str::to_string))
    }

    /// Translated, interpolated string for `key`; the key itself when no
    /// dictionary has it.
    pub fn translate(&self, key: &str, args: Option<&Args>) -> String {
        match (self.lookup(key), args) {
            (Some(value), Some(args)) => interpolate(&value, args),
            (Some(value), None) => value,
            (None, _) => key.to_string(),
        }
    }

    /// Mark the applier as running on the current thread until the guard drops.
    pub fn enter_apply(&self) -> ApplyGuard<'_> {
        let thread = thread::current().id();
        *self.applying.lock().entry(thread).or_insert(0) += 1;
        ApplyGuard { session: self, thread }
    }

    /// Whether an applier pass is running on any thread.
    pub fn is_applying(&self) -> bool {
        !self.applying.lock().is_empty()
    }

    /// Whether document writes made on this thread are the applier's own.
    ///
    /// Mutation records are delivered on the thread that made the write, so
    /// a batch arriving from another thread during a pass is foreign content.
    pub fn is_applying_on_current_thread(&self) -> bool {
        self.applying.lock().contains_key(&thread::current().id())
    }

    /// Take a ticket for a locale switch; later tickets supersede earlier ones.
    pub fn begin_switch(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Commit `locale` and `dictionary` if `ticket` is still the newest switch.
    pub fn commit_if_current(&self, ticket: u64, locale: LocaleId, dictionary: Arc<Dictionary>) -> bool {
        let mut active = self.active.write();
        if !self.is_current(ticket) {
            return false;
        }
        *active = Active { locale, dictionary };
        true
    }
}

/// RAII marker for an applier pass; see [`Session::enter_apply`].
#[derive(Debug)]
pub struct ApplyGuard<'a> {
    session: &'a Session,
    thread: ThreadId,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        let mut applying = self.session.applying.lock();
        if let Some(depth) = applying.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                applying.remove(&self.thread);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;
    use serde_json::json;

    async fn session() -> Session {
        let source = MemorySource::new()
            .with_dictionary("en", json!({"common": {"language": "Language", "hi": "Hi {name}"}}))
            .with_dictionary("fr", json!({"common": {"hi": "Salut {name}"}}));
        let store = Arc::new(DictionaryStore::new(Arc::new(source), "en"));
        let session = Session::new(Arc::clone(&store));

        let ticket = session.begin_switch();
        let fr = store.load(&LocaleId::new("fr")).await;
        store.load(&LocaleId::new("en")).await;
        assert!(session.commit_if_current(ticket, LocaleId::new("fr"), fr));
        session
    }

    #[test]
    fn test_initial_state() {
        let store = Arc::new(DictionaryStore::new(Arc::new(MemorySource::new()), "en"));
        let session = Session::new(store);
        assert_eq!(session.locale(), "en");
        assert!(session.dictionary().is_empty());
        assert_eq!(session.translate("a.b", None), "a.b");
    }

    #[tokio::test]
    async fn test_translate_with_default_fallback() {
        let session = session().await;
        let args = Args::new().with("name", "X");

        assert_eq!(session.translate("common.hi", Some(&args)), "Salut X");
        assert_eq!(session.translate("common.hi", None), "Salut {name}");
        assert_eq!(session.translate("common.language", None), "Language");
        assert_eq!(session.translate("missing.key", Some(&args)), "missing.key");
    }

    #[tokio::test]
    async fn test_stale_ticket_does_not_commit() {
        let session = session().await;
        let older = session.begin_switch();
        let newer = session.begin_switch();

        assert!(!session.commit_if_current(older, LocaleId::new("en"), Arc::new(Dictionary::empty())));
        assert_eq!(session.locale(), "fr");
        assert!(session.is_current(newer));
    }

    #[test]
    fn test_apply_guard_nests() {
        let store = Arc::new(DictionaryStore::new(Arc::new(MemorySource::new()), "en"));
        let session = Session::new(store);
        assert!(!session.is_applying());
        {
            let _outer = session.enter_apply();
            {
                let _inner = session.enter_apply();
                assert!(session.is_applying());
            }
            assert!(session.is_applying());
        }
        assert!(!session.is_applying());
    }

    #[test]
    fn test_apply_guard_is_per_thread() {
        let store = Arc::new(DictionaryStore::new(Arc::new(MemorySource::new()), "en"));
        let session = Session::new(store);
        let _guard = session.enter_apply();
        assert!(session.is_applying_on_current_thread());

        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(session.is_applying());
                assert!(!session.is_applying_on_current_thread());
            });
        });
    }
}
