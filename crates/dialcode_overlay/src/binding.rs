//! Lifecycle binding
//!
//! Host-facing handle that follows the host's (container, language) pair.
//! At most one [`AttachmentController`] is live at a time: whenever the pair
//! changes the previous controller is torn down before its replacement is
//! spawned, so stale watchers never overlap fresh ones.

use std::sync::Arc;

use dialcode_dom::{Document, NodeId};
use dialcode_i18n::{CountryTranslations, LanguageCode, TranslationStore};
use tracing::debug;

use crate::controller::{AttachmentController, AttachmentState, OverlayOptions};

/// Keeps a phone widget's country list translated for the host
pub struct PhoneInputTranslation {
    document: Document,
    store: Arc<TranslationStore>,
    options: OverlayOptions,
    container: Option<NodeId>,
    language: Option<LanguageCode>,
    active: Option<AttachmentController>,
}

impl PhoneInputTranslation {
    pub fn new(document: Document, store: Arc<TranslationStore>) -> Self {
        Self::with_options(document, store, OverlayOptions::default())
    }

    pub fn with_options(document: Document, store: Arc<TranslationStore>, options: OverlayOptions) -> Self {
        Self {
            document,
            store,
            options,
            container: None,
            language: None,
            active: None,
        }
    }

    /// Bind `container` and `language` together.
    ///
    /// Returns the translations already resolved for this pair, or an empty
    /// mapping while they are still loading. Must be called within a Tokio
    /// runtime.
    pub fn attach(&mut self, container: Option<NodeId>, language: Option<LanguageCode>) -> CountryTranslations {
        self.container = container;
        self.language = language;
        self.reconcile();
        self.translations()
    }

    /// The host's container reference changed (`None` once unmounted)
    pub fn set_container(&mut self, container: Option<NodeId>) {
        self.container = container;
        self.reconcile();
    }

    /// The host's language changed (`None` until known)
    pub fn set_language(&mut self, language: Option<LanguageCode>) {
        self.language = language;
        self.reconcile();
    }

    /// Release the active controller, if any. The binding can be reattached.
    pub fn detach(&mut self) {
        self.container = None;
        self.language = None;
        self.release();
    }

    /// Translations of the active controller (empty until armed)
    pub fn translations(&self) -> CountryTranslations {
        self.active
            .as_ref()
            .and_then(AttachmentController::translations)
            .unwrap_or_default()
    }

    pub fn state(&self) -> AttachmentState {
        self.active
            .as_ref()
            .map_or(AttachmentState::Idle, AttachmentController::state)
    }

    pub fn controller(&self) -> Option<&AttachmentController> {
        self.active.as_ref()
    }

    /// Wait for the active controller to arm, returning the state it settled in
    pub async fn wait_armed(&self) -> AttachmentState {
        match &self.active {
            Some(controller) => controller.wait_armed().await,
            None => AttachmentState::Idle,
        }
    }

    fn reconcile(&mut self) {
        let (Some(container), Some(language)) = (self.container, self.language.clone()) else {
            self.release();
            return;
        };
        if language.is_empty() {
            self.release();
            return;
        }

        if let Some(active) = &self.active {
            let same_pair = active.container() == container && *active.language() == language;
            if same_pair && active.state() != AttachmentState::TornDown {
                return;
            }
        }

        self.release();
        debug!(?container, language = %language, "attaching overlay");
        self.active = Some(AttachmentController::spawn(
            self.document.clone(),
            container,
            language,
            Arc::clone(&self.store),
            &self.options,
        ));
    }

    fn release(&mut self) {
        if let Some(controller) = self.active.take() {
            controller.teardown();
        }
    }
}

impl Drop for PhoneInputTranslation {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PhoneInputTranslation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneInputTranslation")
            .field("container", &self.container)
            .field("language", &self.language)
            .field("state", &self.state())
            .finish()
    }
}
