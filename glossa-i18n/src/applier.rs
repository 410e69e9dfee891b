//! Writing translations into the document
//!
//! Elements opt in through marker attributes:
//!
//! | Attribute        | Effect |
//! |------------------|--------|
//! | `data-i18n`      | Text content replaced by the translated key |
//! | `data-i18n-html` | Inner markup replaced by the translated key (not sanitized) |
//! | `data-i18n-attr` | With `data-i18n`, each listed attribute set from `<key>.<attribute>` |

use crate::Session;
use glossa_dom::{Document, NodeId};
use glossa_log::{debug, warn};
use std::sync::Arc;

pub const TEXT_MARKER: &str = "data-i18n";
pub const HTML_MARKER: &str = "data-i18n-html";
pub const ATTR_MARKER: &str = "data-i18n-attr";

const MARKERS: [&str; 3] = [TEXT_MARKER, HTML_MARKER, ATTR_MARKER];

/// Dictionary sub-key for an attribute target.
///
/// `aria-label` is looked up as `ariaLabel`; other names are used as-is.
pub fn attribute_sub_key(attribute: &str) -> &str {
    match attribute {
        "aria-label" => "ariaLabel",
        other => other,
    }
}

/// What one applier pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Elements carrying at least one marker
    pub matched: usize,
    pub text_writes: usize,
    pub markup_writes: usize,
    pub attribute_writes: usize,
    /// Attribute targets left untouched because no dictionary had the key
    pub attributes_skipped: usize,
}

/// Applies the session's active translations to marked elements.
#[derive(Debug, Clone)]
pub struct Applier {
    session: Arc<Session>,
}

impl Applier {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Translate every marked element at or beneath `root`, in document order.
    ///
    /// Mutation records produced by these writes are delivered while the
    /// session's apply guard is held.
    pub fn apply(&self, document: &Document, root: NodeId) -> ApplyReport {
        let _guard = self.session.enter_apply();
        let mut report = ApplyReport::default();

        for element in document.elements_with_any_attribute(root, &MARKERS) {
            report.matched += 1;
            self.apply_element(document, element, &mut report);
        }

        debug!(
            target: "glossa::applier",
            "Applied {} to {} element(s): {} text, {} markup, {} attribute write(s), {} skipped",
            self.session.locale(),
            report.matched,
            report.text_writes,
            report.markup_writes,
            report.attribute_writes,
            report.attributes_skipped
        );
        report
    }

    fn apply_element(&self, document: &Document, element: NodeId, report: &mut ApplyReport) {
        let key = document
            .get_attribute(element, TEXT_MARKER)
            .filter(|k| !k.is_empty());
        let html_key = document
            .get_attribute(element, HTML_MARKER)
            .filter(|k| !k.is_empty());
        let attr_list = document.get_attribute(element, ATTR_MARKER);

        if let Some(key) = &key {
            if attr_list.is_none() && !document.has_attribute(element, HTML_MARKER) {
                let text = self.session.translate(key, None);
                if write(document.set_text_content(element, &text), element) {
                    report.text_writes += 1;
                }
            }
        }

        if let Some(html_key) = &html_key {
            let markup = self.session.translate(html_key, None);
            if write(document.set_inner_html(element, &markup), element) {
                report.markup_writes += 1;
            }
        }

        if let (Some(attr_list), Some(key)) = (&attr_list, &key) {
            for attribute in attr_list.split(',').map(str::trim).filter(|a| !a.is_empty()) {
                let lookup_key = format!("{}.{}", key, attribute_sub_key(attribute));
                match self.session.lookup(&lookup_key) {
                    Some(value) => {
                        if write(document.set_attribute(element, attribute, &value), element) {
                            report.attribute_writes += 1;
                        }
                    }
                    None => report.attributes_skipped += 1,
                }
            }
        }
    }
}

fn write(result: glossa_dom::Result<()>, element: NodeId) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(target: "glossa::applier", "Skipping {}: {}", element, err);
            false
        }
    }
}
