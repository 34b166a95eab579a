//! End-to-end behavior of the overlay against the headless widget.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dialcode_dom::{Document, NodeId};
use dialcode_i18n::{
    CountryTranslations, DirLoader, I18nError, LanguageCode, MemoryLoader, TranslationLoader,
    TranslationStore,
};
use dialcode_overlay::{
    AttachmentState, OverlayOptions, PhoneInputTranslation, PhoneInputWidget, WidgetConfig,
    WidgetMarkup, COUNTRIES,
};
use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

fn locales_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../resource/locales")
}

fn memory_store() -> Arc<TranslationStore> {
    Arc::new(TranslationStore::new(
        MemoryLoader::new()
            .with_json("es", r#"{ "us": "Estados Unidos", "fr": "Francia" }"#)
            .with_json("fr", r#"{ "us": "États-Unis", "de": "Allemagne" }"#),
    ))
}

struct Page {
    doc: Document,
    container: NodeId,
    widget: PhoneInputWidget,
}

impl Page {
    fn new() -> Self {
        let doc = Document::new();
        let (container, widget) = mount(&doc);
        Self {
            doc,
            container,
            widget,
        }
    }

    /// `(code, name, title, aria-label)` of every rendered entry
    fn entries(&self) -> Vec<(String, String, String, String)> {
        let m = WidgetMarkup::default();
        let Some(dropdown) = self.widget.dropdown() else {
            return Vec::new();
        };
        self.doc
            .query_selector_all(dropdown, &m.item_selector())
            .into_iter()
            .map(|li| {
                let name = self
                    .doc
                    .query_selector(li, &m.country_name_selector())
                    .and_then(|n| self.doc.text(n))
                    .unwrap_or_default();
                (
                    self.doc.attribute(li, "data-country").unwrap_or_default(),
                    name,
                    self.doc.attribute(li, "title").unwrap_or_default(),
                    self.doc.attribute(li, "aria-label").unwrap_or_default(),
                )
            })
            .collect()
    }

    fn name_of(&self, code: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(c, ..)| c == code)
            .map(|(_, name, ..)| name)
    }

    fn dropdown_html(&self) -> Option<String> {
        self.widget.dropdown().and_then(|d| self.doc.outer_html(d))
    }
}

fn mount(doc: &Document) -> (NodeId, PhoneInputWidget) {
    let container = doc.create_element("div");
    doc.append_child(doc.root(), container).unwrap();
    let widget = PhoneInputWidget::mount(doc, container, WidgetConfig::default()).unwrap();
    (container, widget)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

/// Loader that holds every load until released
struct GatedLoader {
    inner: MemoryLoader,
    gate: Notify,
}

impl TranslationLoader for GatedLoader {
    fn load<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<CountryTranslations, I18nError>> {
        Box::pin(async move {
            self.gate.notified().await;
            self.inner.load(language).await
        })
    }
}

fn gated() -> Arc<GatedLoader> {
    Arc::new(GatedLoader {
        inner: MemoryLoader::new().with_json("fr", r#"{ "us": "États-Unis" }"#),
        gate: Notify::new(),
    })
}

#[tokio::test(start_paused = true)]
async fn opened_dropdown_is_translated() {
    let page = Page::new();
    let store = Arc::new(TranslationStore::new(DirLoader::new(locales_dir())));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);

    overlay.attach(Some(page.container), Some("fr".into()));
    assert_eq!(overlay.wait_armed().await, AttachmentState::Armed);

    page.widget.toggle().unwrap();
    settle().await;

    let entries = page.entries();
    assert_eq!(entries.len(), COUNTRIES.len());
    let us = entries.iter().find(|(code, ..)| code == "us").unwrap();
    assert_eq!(
        us,
        &(
            "us".to_string(),
            "États-Unis".to_string(),
            "États-Unis".to_string(),
            "États-Unis +1".to_string()
        )
    );
    // every bundled French name made it in
    for (code, name, title, _) in &entries {
        assert_eq!(name, title, "{code}");
        assert_eq!(Some(name.as_str()), overlay.translations().get(code), "{code}");
    }
}

#[tokio::test(start_paused = true)]
async fn partial_catalog_leaves_other_entries_alone() {
    let page = Page::new();
    let store = Arc::new(TranslationStore::new(DirLoader::new(locales_dir())));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);
    overlay.attach(Some(page.container), Some("de".into()));
    overlay.wait_armed().await;

    page.widget.toggle().unwrap();
    settle().await;

    assert_eq!(page.name_of("us").as_deref(), Some("Vereinigte Staaten"));
    let jp = page.entries().into_iter().find(|(c, ..)| c == "jp").unwrap();
    assert_eq!(
        jp,
        (
            "jp".to_string(),
            "Japan".to_string(),
            "Japan".to_string(),
            "Japan +81".to_string()
        )
    );
}

#[tokio::test(start_paused = true)]
async fn unsupported_language_falls_back_to_spanish() {
    let page = Page::new();
    let store = Arc::new(TranslationStore::new(DirLoader::new(locales_dir())));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);
    overlay.attach(Some(page.container), Some("xx".into()));
    overlay.wait_armed().await;

    page.widget.toggle().unwrap();
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("Estados Unidos"));
}

#[tokio::test(start_paused = true)]
async fn empty_mapping_still_arms_and_changes_nothing() {
    let page = Page::new();
    let store = Arc::new(TranslationStore::new(MemoryLoader::new()));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);

    let initial = overlay.attach(Some(page.container), Some("fr".into()));
    assert!(initial.is_empty());
    assert_eq!(overlay.wait_armed().await, AttachmentState::Armed);
    assert!(overlay.translations().is_empty());

    page.widget.toggle().unwrap();
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("United States"));
}

#[tokio::test(start_paused = true)]
async fn both_triggers_converge_on_the_same_result() {
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;

    // render lands at 20ms (mutation patch), click re-check at 50ms
    page.widget.toggle().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_mutation = page.dropdown_html();
    assert_eq!(page.name_of("us").as_deref(), Some("États-Unis"));
    assert_eq!(overlay.controller().unwrap().patch_count(), 1);

    settle().await;
    assert_eq!(overlay.controller().unwrap().patch_count(), 2);
    assert_eq!(page.dropdown_html(), after_mutation);
}

#[tokio::test(start_paused = true)]
async fn dropdown_rendered_synchronously_is_patched() {
    let doc = Document::new();
    let container = doc.create_element("div");
    doc.append_child(doc.root(), container).unwrap();
    let widget = PhoneInputWidget::mount(
        &doc,
        container,
        WidgetConfig {
            render_delay: Duration::ZERO,
            ..Default::default()
        },
    )
    .unwrap();
    let mut overlay = PhoneInputTranslation::new(doc.clone(), memory_store());
    overlay.attach(Some(container), Some("fr".into()));
    overlay.wait_armed().await;

    widget.toggle().unwrap();
    let m = WidgetMarkup::default();
    let dropdown = widget.dropdown().unwrap();
    let names: Vec<String> = doc
        .query_selector_all(dropdown, &m.country_name_selector())
        .into_iter()
        .filter_map(|n| doc.text(n))
        .collect();
    assert!(names.iter().any(|n| n == "États-Unis"));
    assert!(names.iter().any(|n| n == "Allemagne"));
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_pending_recheck() {
    // control: with the overlay attached the late render is translated
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;
    page.widget.toggle().unwrap();
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("États-Unis"));

    // same steps, detached right after the click
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;
    let (observers, listeners) = (page.doc.observer_count(), page.doc.listener_count());

    page.widget.toggle().unwrap();
    assert!(overlay.controller().unwrap().has_pending_recheck());
    overlay.detach();
    assert_eq!(page.doc.observer_count(), observers - 1);
    assert_eq!(page.doc.listener_count(), listeners - 1);

    settle().await;
    assert!(page.widget.dropdown().is_some());
    assert_eq!(page.name_of("us").as_deref(), Some("United States"));
}

#[tokio::test(start_paused = true)]
async fn detach_while_loading_never_arms() {
    let page = Page::new();
    let loader = gated();
    let store = Arc::new(TranslationStore::from_arc(loader.clone()));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);

    overlay.attach(Some(page.container), Some("fr".into()));
    assert_eq!(overlay.state(), AttachmentState::Loading);
    overlay.detach();

    loader.gate.notify_one();
    page.widget.toggle().unwrap();
    settle().await;

    assert_eq!(overlay.state(), AttachmentState::Idle);
    assert_eq!(page.doc.observer_count(), 0);
    assert_eq!(page.name_of("us").as_deref(), Some("United States"));
}

#[tokio::test(start_paused = true)]
async fn dropdown_opened_while_loading_waits_for_next_signal() {
    let page = Page::new();
    let loader = gated();
    let store = Arc::new(TranslationStore::from_arc(loader.clone()));
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), store);
    overlay.attach(Some(page.container), Some("fr".into()));

    page.widget.toggle().unwrap();
    settle().await;
    loader.gate.notify_one();
    assert_eq!(overlay.wait_armed().await, AttachmentState::Armed);
    assert_eq!(page.name_of("us").as_deref(), Some("United States"));

    // closing and reopening renders a fresh dropdown, which gets patched
    page.widget.toggle().unwrap();
    page.widget.toggle().unwrap();
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("États-Unis"));
}

#[tokio::test(start_paused = true)]
async fn patch_on_arm_covers_dropdown_opened_while_loading() {
    let page = Page::new();
    let loader = gated();
    let store = Arc::new(TranslationStore::from_arc(loader.clone()));
    let options = OverlayOptions {
        patch_on_arm: true,
        ..Default::default()
    };
    let mut overlay = PhoneInputTranslation::with_options(page.doc.clone(), store, options);
    overlay.attach(Some(page.container), Some("fr".into()));

    page.widget.toggle().unwrap();
    settle().await;
    loader.gate.notify_one();
    overlay.wait_armed().await;
    assert_eq!(page.name_of("us").as_deref(), Some("États-Unis"));
}

#[tokio::test(start_paused = true)]
async fn language_change_replaces_controller() {
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;

    overlay.set_language(Some("es".into()));
    assert_eq!(overlay.state(), AttachmentState::Loading);
    overlay.wait_armed().await;
    assert_eq!(page.doc.observer_count(), 1);
    assert_eq!(overlay.controller().unwrap().language().as_str(), "es");

    page.widget.toggle().unwrap();
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("Estados Unidos"));
}

#[tokio::test(start_paused = true)]
async fn container_change_moves_watchers() {
    let first = Page::new();
    let doc = first.doc.clone();
    let (second_container, second_widget) = mount(&doc);

    let mut overlay = PhoneInputTranslation::new(doc.clone(), memory_store());
    overlay.attach(Some(first.container), Some("fr".into()));
    overlay.wait_armed().await;

    overlay.set_container(Some(second_container));
    overlay.wait_armed().await;
    assert_eq!(doc.observer_count(), 1);

    first.widget.toggle().unwrap();
    second_widget.toggle().unwrap();
    settle().await;

    assert_eq!(first.name_of("us").as_deref(), Some("United States"));
    let second = Page {
        doc: doc.clone(),
        container: second_container,
        widget: second_widget,
    };
    assert_eq!(second.name_of("us").as_deref(), Some("États-Unis"));

    overlay.set_container(None);
    assert_eq!(overlay.state(), AttachmentState::Idle);
    assert_eq!(doc.observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn container_change_cancels_pending_recheck() {
    let first = Page::new();
    let doc = first.doc.clone();
    let (second_container, _second_widget) = mount(&doc);

    let mut overlay = PhoneInputTranslation::new(doc.clone(), memory_store());
    overlay.attach(Some(first.container), Some("fr".into()));
    overlay.wait_armed().await;

    first.widget.toggle().unwrap();
    assert!(overlay.controller().unwrap().has_pending_recheck());
    overlay.set_container(Some(second_container));
    overlay.wait_armed().await;

    // the first dropdown lands after the switch; nothing from the old binding touches it
    settle().await;
    assert!(first.widget.dropdown().is_some());
    assert_eq!(first.name_of("us").as_deref(), Some("United States"));
    assert_eq!(overlay.controller().unwrap().patch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn language_change_cancels_pending_recheck() {
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;

    page.widget.toggle().unwrap();
    assert!(overlay.controller().unwrap().has_pending_recheck());
    overlay.set_language(Some("es".into()));
    overlay.wait_armed().await;

    // a French re-check firing at 50ms would overwrite the Spanish patch
    settle().await;
    assert_eq!(page.name_of("us").as_deref(), Some("Estados Unidos"));
    assert_eq!(page.name_of("fr").as_deref(), Some("Francia"));
}

#[tokio::test(start_paused = true)]
async fn removed_container_tears_down_without_interaction() {
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;
    assert_eq!(page.doc.observer_count(), 1);

    page.doc.remove(page.container).unwrap();
    assert_eq!(overlay.state(), AttachmentState::TornDown);
    assert_eq!(page.doc.observer_count(), 0);

    settle().await;
    assert_eq!(overlay.state(), AttachmentState::TornDown);
}

#[tokio::test(start_paused = true)]
async fn removed_container_tears_itself_down() {
    let page = Page::new();
    let mut overlay = PhoneInputTranslation::new(page.doc.clone(), memory_store());
    overlay.attach(Some(page.container), Some("fr".into()));
    overlay.wait_armed().await;

    page.widget.toggle().unwrap();
    page.doc.remove(page.container).unwrap();
    settle().await;

    assert_eq!(overlay.state(), AttachmentState::TornDown);
    assert_eq!(page.doc.observer_count(), 0);
    assert!(overlay.translations().get("us").is_some());
}
