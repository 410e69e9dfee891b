//! Integration tests for common Glossa workflows.
//!
//! These drive the engine through the facade crate the way a host page does:
//! build, init from a navigation path, switch locales, insert content.

use glossa::prelude::*;
use glossa::{FilePreferences, ReconcilerState, audit};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn source() -> MemorySource {
    MemorySource::new()
        .with_dictionary(
            "en",
            json!({
                "common": {"language": "Language"},
                "home": {"title": "White Mountains", "intro": "<em>48</em> peaks"},
                "search": {"ariaLabel": "Search peaks", "placeholder": "Peak name"},
                "a": {"b": "Hi {name}"}
            }),
        )
        .with_dictionary(
            "fr",
            json!({
                "common": {"language": "Langue"},
                "home": {"title": "Montagnes Blanches"},
                "search": {"ariaLabel": "Rechercher"}
            }),
        )
        .with_dictionary("de", json!({"home": {"title": "Weiße Berge"}}))
}

fn build(document: &Document, source: MemorySource, prefs: Arc<dyn PreferenceStore>) -> I18n {
    I18n::builder()
        .document(document.clone())
        .source(Arc::new(source))
        .preferences(prefs)
        .build()
        .unwrap()
}

fn element(document: &Document, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
    let el = document.create_element(tag);
    for (name, value) in attrs {
        document.set_attribute(el, name, value).unwrap();
    }
    document.append_child(document.body(), el).unwrap();
    el
}

// =============================================================================
// Page lifecycle
// =============================================================================

#[tokio::test]
async fn test_static_page_is_translated_on_init() {
    let document = Document::new();
    let title = element(&document, "h1", &[("data-i18n", "home.title")]);
    let intro = element(&document, "p", &[("data-i18n-html", "home.intro")]);
    let search = element(
        &document,
        "input",
        &[
            ("data-i18n", "search"),
            ("data-i18n-attr", "aria-label,placeholder,title"),
            ("title", "Search"),
        ],
    );

    let engine = build(&document, source(), Arc::new(MemoryPreferences::new()));
    engine.init(Navigation::path("/fr/peaks/")).await.unwrap();

    assert_eq!(engine.locale(), "fr");
    assert_eq!(document.text_content(title), "Montagnes Blanches");
    // Missing in fr, resolved from en.
    assert_eq!(document.inner_html(intro), "<em>48</em> peaks");
    assert_eq!(document.get_attribute(search, "aria-label").as_deref(), Some("Rechercher"));
    assert_eq!(document.get_attribute(search, "placeholder").as_deref(), Some("Peak name"));
    assert_eq!(document.get_attribute(search, "title").as_deref(), Some("Search"));

    let html = document.document_element();
    assert_eq!(document.get_attribute(html, "lang").as_deref(), Some("fr"));
    assert_eq!(document.get_attribute(html, "dir").as_deref(), Some("ltr"));
}

#[tokio::test]
async fn test_preference_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    {
        let document = Document::new();
        let engine = build(&document, source(), Arc::new(FilePreferences::new(&path)));
        engine.init(Navigation::path("/")).await.unwrap();
        assert_eq!(engine.locale(), "en");
        engine.set_locale("de").await;
        engine.shutdown();
    }

    let document = Document::new();
    let engine = build(&document, source(), Arc::new(FilePreferences::new(&path)));
    engine.init(Navigation::path("/fr/")).await.unwrap();
    assert_eq!(engine.locale(), "de");
    assert_eq!(engine.t("home.title"), "Weiße Berge");
}

// =============================================================================
// Observable properties
// =============================================================================

#[tokio::test]
async fn test_interpolation_through_facade() {
    let document = Document::new();
    let engine = build(&document, source(), Arc::new(MemoryPreferences::new()));
    engine.set_locale("en").await;

    let args = Args::new().with("name", "X");
    assert_eq!(engine.translate("a.b", Some(&args)), "Hi X");
    assert_eq!(engine.translate("a.b", None), "Hi {name}");
    assert_eq!(engine.t("x.y.z"), "x.y.z");
}

#[tokio::test]
async fn test_apply_twice_is_idempotent() {
    let document = Document::new();
    element(&document, "h1", &[("data-i18n", "home.title")]);
    element(&document, "p", &[("data-i18n-html", "home.intro")]);
    element(
        &document,
        "input",
        &[("data-i18n", "search"), ("data-i18n-attr", "aria-label")],
    );
    let engine = build(&document, source(), Arc::new(MemoryPreferences::new()));
    engine.set_locale("fr").await;

    let once = document.outer_html(document.root());
    engine.apply(document.root());
    engine.apply(document.root());
    assert_eq!(document.outer_html(document.root()), once);
}

#[tokio::test(start_paused = true)]
async fn test_thousand_node_batch_applies_once() {
    let document = Document::new();
    let engine = build(&document, source(), Arc::new(MemoryPreferences::new()));
    engine.init(Navigation::path("/de/")).await.unwrap();
    let reconciler = engine.reconciler().unwrap();

    let list = document.create_element("ul");
    let items: Vec<NodeId> = (0..1000)
        .map(|_| {
            let li = document.create_element("li");
            document.set_attribute(li, "data-i18n", "home.title").unwrap();
            document.append_child(list, li).unwrap();
            li
        })
        .collect();
    document.append_child(document.body(), list).unwrap();

    tokio::time::sleep(Duration::from_millis(75 * 10)).await;
    let stats = reconciler.stats();
    assert_eq!(stats.scheduled, 1);
    assert_eq!(stats.applied, 1);
    assert_eq!(reconciler.state(), ReconcilerState::Idle);
    assert!(items.iter().all(|li| document.text_content(*li) == "Weiße Berge"));
    assert!(audit::unresolved_markers(&document, document.root()).is_empty());
}

#[tokio::test]
async fn test_failed_dictionary_degrades_quietly() {
    let captured: Arc<Mutex<Vec<String>>> = Arc::default();
    glossa::log::init();
    let sink = Arc::clone(&captured);
    glossa::log::install_sink(Arc::new(move |record: &glossa::log::Record<'_>| {
        if record.target == "glossa::store" {
            sink.lock().push(record.message.to_string());
        }
    }));

    let document = Document::new();
    let title = element(&document, "h1", &[("data-i18n", "common.language")]);
    let engine = build(
        &document,
        source().with_failure("de", 500),
        Arc::new(MemoryPreferences::new()),
    );
    engine.set_locale("de").await;
    glossa::log::clear_sink();

    assert_eq!(engine.locale(), "de");
    assert_eq!(engine.t("common.language"), "Language");
    assert_eq!(document.text_content(title), "Language");
    assert!(
        captured
            .lock()
            .iter()
            .any(|m| m.contains("Falling back to en") && m.contains("de"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rapid_switches_end_on_last_choice() {
    let document = Document::new();
    let title = element(&document, "h1", &[("data-i18n", "home.title")]);
    let engine = build(
        &document,
        source()
            .with_latency("fr", Duration::from_millis(300))
            .with_latency("de", Duration::from_millis(20)),
        Arc::new(MemoryPreferences::new()),
    );

    let notified: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&notified);
    engine.on_locale_change(move |id| sink.lock().push(id.to_string()));

    let fr = engine.clone();
    let de = engine.clone();
    let (_, _) = tokio::join!(fr.set_locale("fr"), async {
        tokio::task::yield_now().await;
        de.set_locale("de").await
    });

    assert_eq!(engine.locale(), "de");
    assert_eq!(document.text_content(title), "Weiße Berge");
    assert_eq!(*notified.lock(), vec!["de".to_string()]);
}
