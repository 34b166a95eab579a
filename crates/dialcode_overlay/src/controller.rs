//! Attachment controller
//!
//! Binds one container and one language. Once translations resolve it
//! watches the container two ways and re-applies the overlay from both:
//!
//! - a structural observer: any inserted-node batch under the container
//!   triggers a patch of the dropdown, if one is rendered; removal of the
//!   container itself tears the controller down
//! - a click listener on the widget's toggle: schedules a single delayed
//!   re-check, giving the widget time to finish its own render
//!
//! Both paths may fire for the same dropdown opening; the patch is
//! idempotent, so the result does not depend on which arrives first.
//!
//! ```text
//! Idle ──▶ Loading ──▶ Armed ──┐
//!   │         │          ▲     │ mutation / click re-check
//!   │         │          └─────┘
//!   └─────────┴──────────┴──▶ TornDown
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dialcode_dom::{
    event_types, Document, ListenerId, MutationKind, MutationRecord, NodeId, ObserveOptions, ObserverId,
};
use dialcode_i18n::{CountryTranslations, LanguageCode, TranslationStore};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::markup::WidgetMarkup;
use crate::patcher::OverlayPatcher;

/// Default wait between a toggle click and the re-check
pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_millis(50);

/// Tuning for [`AttachmentController`]
#[derive(Clone, Debug)]
pub struct OverlayOptions {
    /// Delay between a toggle click and the follow-up patch attempt
    pub recheck_delay: Duration,
    /// Patch an already-rendered dropdown as soon as translations arrive.
    ///
    /// Off by default: a dropdown opened while translations were still
    /// loading stays untranslated until the next insertion or click.
    pub patch_on_arm: bool,
    pub markup: WidgetMarkup,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            recheck_delay: DEFAULT_RECHECK_DELAY,
            patch_on_arm: false,
            markup: WidgetMarkup::default(),
        }
    }
}

/// Lifecycle of one (container, language) binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentState {
    /// Container or language not available yet
    Idle,
    /// Translations requested, not yet resolved
    Loading,
    /// Watchers attached; patches run on every signal
    Armed,
    /// Terminal: every watcher released
    TornDown,
}

struct Inner {
    state: AttachmentState,
    translations: Option<CountryTranslations>,
    observer: Option<ObserverId>,
    listener: Option<ListenerId>,
    load: Option<JoinHandle<()>>,
    /// Pending re-check, tagged so a superseded task can't clear its successor
    recheck: Option<(u64, JoinHandle<()>)>,
    next_ticket: u64,
}

struct Shared {
    document: Document,
    container: NodeId,
    language: LanguageCode,
    patcher: OverlayPatcher,
    recheck_delay: Duration,
    patch_on_arm: bool,
    runtime: Handle,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AttachmentState>,
    patches: AtomicUsize,
}

/// Owns the watchers of one active binding.
///
/// Dropping the controller tears it down.
pub struct AttachmentController {
    shared: Arc<Shared>,
}

impl AttachmentController {
    /// Start loading translations for `language` and arm once they resolve.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(
        document: Document,
        container: NodeId,
        language: LanguageCode,
        store: Arc<TranslationStore>,
        options: &OverlayOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(AttachmentState::Idle);
        let shared = Arc::new(Shared {
            document,
            container,
            language: language.clone(),
            patcher: OverlayPatcher::new(options.markup.clone()),
            recheck_delay: options.recheck_delay,
            patch_on_arm: options.patch_on_arm,
            runtime: Handle::current(),
            inner: Mutex::new(Inner {
                state: AttachmentState::Idle,
                translations: None,
                observer: None,
                listener: None,
                load: None,
                recheck: None,
                next_ticket: 0,
            }),
            state_tx,
            patches: AtomicUsize::new(0),
        });

        {
            let mut inner = shared.inner.lock();
            shared.transition(&mut inner, AttachmentState::Loading);
            let weak = Arc::downgrade(&shared);
            inner.load = Some(shared.runtime.spawn(async move {
                let translations = store.load(&language).await;
                if let Some(shared) = weak.upgrade() {
                    shared.arm(translations);
                }
            }));
        }

        Self { shared }
    }

    pub fn state(&self) -> AttachmentState {
        self.shared.inner.lock().state
    }

    pub fn container(&self) -> NodeId {
        self.shared.container
    }

    pub fn language(&self) -> &LanguageCode {
        &self.shared.language
    }

    /// Resolved translations, once armed
    pub fn translations(&self) -> Option<CountryTranslations> {
        self.shared.inner.lock().translations.clone()
    }

    /// Number of patch passes that found a dropdown
    pub fn patch_count(&self) -> usize {
        self.shared.patches.load(Ordering::SeqCst)
    }

    /// Whether a click re-check is scheduled
    pub fn has_pending_recheck(&self) -> bool {
        self.shared.inner.lock().recheck.is_some()
    }

    /// Wait until the controller is armed (or torn down first)
    pub async fn wait_armed(&self) -> AttachmentState {
        let mut rx = self.shared.state_tx.subscribe();
        let reached = rx
            .wait_for(|s| matches!(s, AttachmentState::Armed | AttachmentState::TornDown))
            .await
            .map(|state| *state);
        reached.unwrap_or(AttachmentState::TornDown)
    }

    /// Release every watcher and cancel pending work. Idempotent.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

impl Drop for AttachmentController {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl std::fmt::Debug for AttachmentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentController")
            .field("container", &self.shared.container)
            .field("language", &self.shared.language)
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn transition(&self, inner: &mut Inner, to: AttachmentState) {
        debug!(
            container = ?self.container,
            language = %self.language,
            from = ?inner.state,
            to = ?to,
            "overlay attachment"
        );
        inner.state = to;
        self.state_tx.send_replace(to);
    }

    /// Loading -> Armed: keep the translations and attach both watchers
    fn arm(self: &Arc<Self>, translations: CountryTranslations) {
        let mut inner = self.inner.lock();
        if inner.state != AttachmentState::Loading {
            return;
        }
        inner.load = None;
        inner.translations = Some(translations);

        let weak = Arc::downgrade(self);
        match self.document.observe(
            self.container,
            ObserveOptions::structural(),
            move |records: &[MutationRecord]| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if records.iter().any(|r| r.kind == MutationKind::TargetRemoved) {
                    debug!(container = ?shared.container, "container removed; tearing down");
                    shared.teardown();
                } else if records.iter().any(|r| !r.added_nodes.is_empty()) {
                    shared.patch_dropdown("mutation");
                }
            },
        ) {
            Ok(id) => inner.observer = Some(id),
            Err(err) => debug!(%err, "container gone before arming"),
        }

        let button = self
            .document
            .query_selector(self.container, &self.patcher.markup().button_selector());
        if let Some(button) = button {
            let weak: Weak<Shared> = Arc::downgrade(self);
            let listener = self.document.add_event_listener(button, event_types::CLICK, move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.schedule_recheck();
                }
            });
            inner.listener = listener.ok();
        } else {
            trace!(container = ?self.container, "no selector button; click re-check disabled");
        }

        self.transition(&mut inner, AttachmentState::Armed);
        drop(inner);

        if self.patch_on_arm {
            self.patch_dropdown("arm");
        }
    }

    /// Replace any pending re-check with a fresh one
    fn schedule_recheck(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.state != AttachmentState::Armed {
            return;
        }
        if let Some((_, previous)) = inner.recheck.take() {
            previous.abort();
        }

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        let weak = Arc::downgrade(self);
        let delay = self.recheck_delay;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.run_recheck(ticket);
            }
        });
        inner.recheck = Some((ticket, task));
    }

    fn run_recheck(&self, ticket: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.state != AttachmentState::Armed {
                return;
            }
            match &inner.recheck {
                Some((current, _)) if *current == ticket => inner.recheck = None,
                _ => return,
            }
        }
        self.patch_dropdown("recheck");
    }

    fn patch_dropdown(&self, trigger: &'static str) {
        let translations = {
            let inner = self.inner.lock();
            if inner.state != AttachmentState::Armed {
                return;
            }
            match &inner.translations {
                Some(t) => t.clone(),
                None => return,
            }
        };

        if !self.document.contains(self.container) {
            debug!(container = ?self.container, "container removed; tearing down");
            self.teardown();
            return;
        }

        let dropdown = self
            .document
            .query_selector(self.container, &self.patcher.markup().dropdown_selector());
        let Some(dropdown) = dropdown else {
            trace!(trigger, "dropdown not rendered yet");
            return;
        };

        let report = self.patcher.patch(&self.document, dropdown, &translations);
        self.patches.fetch_add(1, Ordering::SeqCst);
        trace!(
            trigger,
            entries = report.entries,
            translated = report.translated,
            untouched = report.untouched,
            "patched country dropdown"
        );
    }

    fn teardown(&self) {
        let (observer, listener) = {
            let mut inner = self.inner.lock();
            if inner.state == AttachmentState::TornDown {
                return;
            }
            if let Some(task) = inner.load.take() {
                task.abort();
            }
            if let Some((_, task)) = inner.recheck.take() {
                task.abort();
            }
            self.transition(&mut inner, AttachmentState::TornDown);
            (inner.observer.take(), inner.listener.take())
        };

        if let Some(id) = observer {
            self.document.disconnect(id);
        }
        if let Some(id) = listener {
            self.document.remove_event_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{PhoneInputWidget, WidgetConfig};
    use dialcode_i18n::MemoryLoader;

    fn store() -> Arc<TranslationStore> {
        Arc::new(TranslationStore::new(
            MemoryLoader::new()
                .with_json("es", r#"{ "us": "Estados Unidos" }"#)
                .with_json("fr", r#"{ "us": "États-Unis" }"#),
        ))
    }

    fn mounted() -> (Document, NodeId, PhoneInputWidget) {
        let doc = Document::new();
        let container = doc.create_element("div");
        doc.append_child(doc.root(), container).unwrap();
        let widget = PhoneInputWidget::mount(&doc, container, WidgetConfig::default()).unwrap();
        (doc, container, widget)
    }

    #[tokio::test(start_paused = true)]
    async fn loads_then_arms_with_both_watchers() {
        let (doc, container, _widget) = mounted();
        let observers = doc.observer_count();
        let listeners = doc.listener_count();

        let ctl = AttachmentController::spawn(
            doc.clone(),
            container,
            "fr".into(),
            store(),
            &OverlayOptions::default(),
        );
        assert_eq!(ctl.state(), AttachmentState::Loading);
        assert_eq!(ctl.translations(), None);

        assert_eq!(ctl.wait_armed().await, AttachmentState::Armed);
        assert_eq!(ctl.translations().unwrap().get("us"), Some("États-Unis"));
        assert_eq!(doc.observer_count(), observers + 1);
        assert_eq!(doc.listener_count(), listeners + 1);

        ctl.teardown();
        assert_eq!(ctl.state(), AttachmentState::TornDown);
        assert_eq!(doc.observer_count(), observers);
        assert_eq!(doc.listener_count(), listeners);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_while_loading_never_arms() {
        let (doc, container, _widget) = mounted();
        let ctl = AttachmentController::spawn(
            doc.clone(),
            container,
            "fr".into(),
            store(),
            &OverlayOptions::default(),
        );
        ctl.teardown();
        assert_eq!(ctl.wait_armed().await, AttachmentState::TornDown);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ctl.state(), AttachmentState::TornDown);
        assert_eq!(doc.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_clicks_keep_one_pending_recheck() {
        let (doc, container, widget) = mounted();
        let ctl = AttachmentController::spawn(
            doc.clone(),
            container,
            "fr".into(),
            store(),
            &OverlayOptions::default(),
        );
        ctl.wait_armed().await;

        widget.toggle().unwrap();
        widget.toggle().unwrap();
        widget.toggle().unwrap();
        assert!(ctl.has_pending_recheck());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!ctl.has_pending_recheck());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_tears_down() {
        let (doc, container, _widget) = mounted();
        let baseline = (doc.observer_count(), doc.listener_count());
        {
            let ctl = AttachmentController::spawn(
                doc.clone(),
                container,
                "fr".into(),
                store(),
                &OverlayOptions::default(),
            );
            ctl.wait_armed().await;
        }
        assert_eq!((doc.observer_count(), doc.listener_count()), baseline);
    }
}
