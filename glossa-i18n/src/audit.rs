//! Translation coverage diagnostics

use crate::Dictionary;
use glossa_dom::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;

/// Text that looks like an untranslated dotted key, e.g. `peak.detail.title`.
static RAW_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+){2,}$").expect("raw key pattern is valid")
});

/// Whether `text` (trimmed) looks like a dotted key with three or more segments.
pub fn looks_like_raw_key(text: &str) -> bool {
    RAW_KEY.is_match(text.trim())
}

/// Gaps in a candidate dictionary relative to a base dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletenessReport {
    /// Keys present in the base but absent from the candidate
    pub missing: Vec<String>,
    /// Candidate keys whose value is blank
    pub empty: Vec<String>,
    /// Candidate keys whose value is itself a raw key
    pub unresolved: Vec<String>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.empty.is_empty() && self.unresolved.is_empty()
    }
}

/// Compare `candidate` against `base`; every list is sorted.
pub fn completeness(base: &Dictionary, candidate: &Dictionary) -> CompletenessReport {
    let base = base.leaves();
    let candidate = candidate.leaves();

    let missing = base
        .keys()
        .filter(|key| !candidate.contains_key(*key))
        .cloned()
        .collect();
    let empty = candidate
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key.clone())
        .collect();
    let unresolved = candidate
        .iter()
        .filter(|(_, value)| looks_like_raw_key(value))
        .map(|(key, _)| key.clone())
        .collect();

    CompletenessReport {
        missing,
        empty,
        unresolved,
    }
}

/// Text nodes beneath `root` still showing a raw key, with their trimmed text.
pub fn unresolved_markers(document: &Document, root: NodeId) -> Vec<(NodeId, String)> {
    document
        .text_nodes(root)
        .into_iter()
        .filter(|(_, text)| looks_like_raw_key(text))
        .map(|(id, text)| (id, text.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_key_detection() {
        assert!(looks_like_raw_key("peak.detail.title"));
        assert!(looks_like_raw_key("  nav.menu.home_link "));
        assert!(!looks_like_raw_key("nav.home"));
        assert!(!looks_like_raw_key("Mt. Washington is 6.288 ft."));
        assert!(!looks_like_raw_key("www.example.com/a"));
    }

    #[test]
    fn test_completeness() {
        let base = Dictionary::from_value(json!({
            "nav": {"home": "Home", "about": "About"},
            "footer": {"copy": "©"}
        }))
        .unwrap();
        let candidate = Dictionary::from_value(json!({
            "nav": {"home": "  ", "about": "nav.about.label"},
            "extra": "Extra"
        }))
        .unwrap();

        let report = completeness(&base, &candidate);
        assert_eq!(report.missing, vec!["footer.copy".to_string()]);
        assert_eq!(report.empty, vec!["nav.home".to_string()]);
        assert_eq!(report.unresolved, vec!["nav.about".to_string()]);
        assert!(!report.is_complete());
        assert!(completeness(&base, &base).is_complete());
    }

    #[test]
    fn test_unresolved_markers() {
        let document = Document::new();
        let ok = document.create_element("p");
        let raw = document.create_element("p");
        document.set_text_content(ok, "Welcome").unwrap();
        document.set_text_content(raw, "home.hero.title").unwrap();
        document.append_children(document.body(), &[ok, raw]).unwrap();

        let found = unresolved_markers(&document, document.root());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, "home.hero.title");
    }
}
