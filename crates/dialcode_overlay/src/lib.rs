//! Dialcode overlay
//!
//! Keeps the country list of a third-party phone input translated. The
//! widget ships with built-in (English) country names and no way to replace
//! them; the overlay locates its dropdown after every render and rewrites
//! each entry's name, tooltip and accessible label from a
//! [`CountryTranslations`](dialcode_i18n::CountryTranslations) mapping.
//!
//! - [`OverlayPatcher`]: one idempotent rewrite pass over a rendered dropdown
//! - [`AttachmentController`]: watchers for one (container, language) pair
//! - [`PhoneInputTranslation`]: follows the host's pair, one controller at a time
//! - [`PhoneInputWidget`]: headless rendition of the widget itself
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dialcode_dom::Document;
//! use dialcode_i18n::{DirLoader, TranslationStore};
//! use dialcode_overlay::{PhoneInputTranslation, PhoneInputWidget, WidgetConfig};
//!
//! # async fn run() -> dialcode_dom::Result<()> {
//! let doc = Document::new();
//! let container = doc.create_element("div");
//! doc.append_child(doc.root(), container)?;
//! let widget = PhoneInputWidget::mount(&doc, container, WidgetConfig::default())?;
//!
//! let store = Arc::new(TranslationStore::new(DirLoader::new("resource/locales")));
//! let mut overlay = PhoneInputTranslation::new(doc.clone(), store);
//! overlay.attach(Some(container), Some("fr".into()));
//! overlay.wait_armed().await;
//!
//! widget.toggle()?; // the dropdown renders, then gets translated
//! # Ok(())
//! # }
//! ```

mod binding;
mod controller;
mod markup;
mod patcher;
mod widget;

pub use binding::PhoneInputTranslation;
pub use controller::{AttachmentController, AttachmentState, OverlayOptions, DEFAULT_RECHECK_DELAY};
pub use markup::{WidgetMarkup, ARIA_LABEL_ATTRIBUTE, DEFAULT_CLASS_PREFIX, TITLE_ATTRIBUTE};
pub use patcher::{OverlayPatcher, PatchReport};
pub use widget::{ChangeHandler, Country, PhoneInputWidget, WidgetConfig, COUNTRIES};
