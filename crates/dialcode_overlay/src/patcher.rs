//! Country-name overlay
//!
//! Rewrites the display name, tooltip and accessible label of each country
//! entry under a rendered dropdown. Only text and attributes are written,
//! never structure, and a value that is already current is left alone, so
//! re-patching is free and produces no mutation records.

use dialcode_dom::{Document, NodeId};
use dialcode_i18n::CountryTranslations;
use tracing::trace;

use crate::markup::{WidgetMarkup, ARIA_LABEL_ATTRIBUTE, TITLE_ATTRIBUTE};

/// Outcome of one [`OverlayPatcher::patch`] pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Country entries found under the root
    pub entries: usize,
    /// Entries whose code had a translation and were (re)written
    pub translated: usize,
    /// Entries left as the widget rendered them
    pub untouched: usize,
}

/// Applies a [`CountryTranslations`] mapping to a rendered dropdown
#[derive(Clone, Debug, Default)]
pub struct OverlayPatcher {
    markup: WidgetMarkup,
}

impl OverlayPatcher {
    pub fn new(markup: WidgetMarkup) -> Self {
        Self { markup }
    }

    pub fn markup(&self) -> &WidgetMarkup {
        &self.markup
    }

    /// Patch every country entry under `root`.
    ///
    /// Entries with no translation, or without a country-name child, are left
    /// untouched. A root with no entries (or one that has been removed) is a no-op.
    pub fn patch(&self, doc: &Document, root: NodeId, translations: &CountryTranslations) -> PatchReport {
        let mut report = PatchReport::default();
        let name_selector = self.markup.country_name_selector();
        let dial_selector = self.markup.dial_code_selector();

        for item in doc.query_selector_all(root, &self.markup.item_selector()) {
            report.entries += 1;

            let translated = doc
                .attribute(item, &self.markup.country_attribute)
                .and_then(|code| translations.get(&code).map(str::to_string));
            let Some(name) = translated else {
                report.untouched += 1;
                continue;
            };
            let Some(name_node) = doc.query_selector(item, &name_selector) else {
                report.untouched += 1;
                continue;
            };

            write_text(doc, name_node, &name);
            write_attribute(doc, item, TITLE_ATTRIBUTE, &name);

            let dial_code = doc
                .query_selector(item, &dial_selector)
                .and_then(|node| doc.text(node))
                .filter(|text| !text.is_empty());
            if let Some(dial_code) = dial_code {
                write_attribute(doc, item, ARIA_LABEL_ATTRIBUTE, &format!("{name} {dial_code}"));
            }

            report.translated += 1;
        }

        report
    }
}

fn write_text(doc: &Document, node: NodeId, value: &str) {
    if doc.text(node).as_deref() == Some(value) {
        return;
    }
    if let Err(err) = doc.set_text(node, value) {
        trace!(%err, "entry vanished while patching");
    }
}

fn write_attribute(doc: &Document, node: NodeId, name: &str, value: &str) {
    if doc.attribute(node, name).as_deref() == Some(value) {
        return;
    }
    if let Err(err) = doc.set_attribute(node, name, value) {
        trace!(%err, attribute = name, "entry vanished while patching");
    }
}
