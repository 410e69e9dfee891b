//! Locale picker binding
//!
//! Picker buttons are authored by the host page; the engine only wires their
//! activation to a locale switch and mirrors the active locale onto them.

use crate::{LocaleId, PickerConfig};
use glossa_dom::{Document, NodeId};
use glossa_log::trace;
use std::sync::Arc;

/// Marks a button whose click handler is already installed.
pub const BOUND_MARKER: &str = "data-i18n-bound";

/// Class carried by the button of the active locale.
pub const ACTIVE_CLASS: &str = "active";

/// Callback receiving the locale id of an activated button.
pub type SelectHandler = Arc<dyn Fn(LocaleId) + Send + Sync>;

/// Finds picker buttons by class and reads their locale attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePicker {
    class: String,
    attribute: String,
}

impl LocalePicker {
    pub fn new(class: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attribute: attribute.into(),
        }
    }

    pub fn from_config(config: &PickerConfig) -> Self {
        Self::new(config.class.clone(), config.attribute.clone())
    }

    pub fn buttons(&self, document: &Document) -> Vec<NodeId> {
        document.elements_with_class(document.root(), &self.class)
    }

    /// Install a click handler on every button not bound yet; returns how
    /// many were newly bound.
    pub fn bind(&self, document: &Document, on_select: SelectHandler) -> usize {
        let mut bound = 0;
        for button in self.buttons(document) {
            if document.has_attribute(button, BOUND_MARKER) {
                continue;
            }
            if document.set_attribute(button, BOUND_MARKER, "true").is_err() {
                continue;
            }

            let attribute = self.attribute.clone();
            let on_select = Arc::clone(&on_select);
            document.add_event_listener(
                button,
                "click",
                Arc::new(move |document: &Document, node: NodeId| {
                    if let Some(lang) = document.get_attribute(node, &attribute).filter(|l| !l.is_empty()) {
                        on_select(LocaleId::new(lang));
                    }
                }),
            );
            bound += 1;
        }
        trace!(target: "glossa::picker", "Bound {} picker button(s)", bound);
        bound
    }

    /// Toggle the active class and `aria-pressed` to match `locale`.
    pub fn sync_active(&self, document: &Document, locale: &LocaleId) {
        for button in self.buttons(document) {
            let is_active = document
                .get_attribute(button, &self.attribute)
                .is_some_and(|lang| LocaleId::new(lang) == *locale);
            let toggled = document.toggle_class(button, ACTIVE_CLASS, is_active);
            let pressed = if is_active {
                document.set_attribute(button, "aria-pressed", "true")
            } else {
                document.remove_attribute(button, "aria-pressed").map(|_| ())
            };
            if let Err(err) = toggled.and(pressed) {
                trace!(target: "glossa::picker", "Cannot mark {}: {}", button, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn button(document: &Document, lang: &str) -> NodeId {
        let el = document.create_element("button");
        document.set_attribute(el, "class", "locale-flag").unwrap();
        document.set_attribute(el, "data-lang", lang).unwrap();
        document.append_child(document.body(), el).unwrap();
        el
    }

    #[test]
    fn test_bind_is_idempotent() {
        let document = Document::new();
        let picker = LocalePicker::from_config(&PickerConfig::default());
        let fr = button(&document, "fr");
        button(&document, "de");

        let selected: Arc<Mutex<Vec<LocaleId>>> = Arc::default();
        let sink = Arc::clone(&selected);
        let handler: SelectHandler = Arc::new(move |id| sink.lock().push(id));

        assert_eq!(picker.bind(&document, Arc::clone(&handler)), 2);
        assert_eq!(picker.bind(&document, Arc::clone(&handler)), 0);
        assert_eq!(document.listener_count(fr, "click"), 1);

        button(&document, "ja");
        assert_eq!(picker.bind(&document, handler), 1);

        document.dispatch_event(fr, "click");
        assert_eq!(*selected.lock(), vec![LocaleId::new("fr")]);
    }

    #[test]
    fn test_sync_active() {
        let document = Document::new();
        let picker = LocalePicker::new("locale-flag", "data-lang");
        let fr = button(&document, "fr");
        let de = button(&document, "de");

        picker.sync_active(&document, &LocaleId::new("fr"));
        assert!(document.has_class(fr, ACTIVE_CLASS));
        assert_eq!(document.get_attribute(fr, "aria-pressed").as_deref(), Some("true"));
        assert!(!document.has_class(de, ACTIVE_CLASS));

        picker.sync_active(&document, &LocaleId::new("de"));
        assert!(!document.has_class(fr, ACTIVE_CLASS));
        assert_eq!(document.get_attribute(fr, "aria-pressed"), None);
        assert!(document.has_class(de, "locale-flag"));
        assert!(document.has_class(de, ACTIVE_CLASS));
    }
}
