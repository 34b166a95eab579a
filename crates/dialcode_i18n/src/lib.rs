//! Dialcode country-name translations
//!
//! - [`CountryTranslations`]: immutable country code -> localized name mapping
//! - [`TranslationLoader`]: where catalogs come from (`DirLoader`, `MemoryLoader`)
//! - [`TranslationStore`]: total, fallback-aware loading with an optional LRU memo
//!
//! Catalogs are flat JSON objects or YAML mappings:
//!
//! ```json
//! { "us": "États-Unis", "de": "Allemagne" }
//! ```

mod catalog;
mod error;
mod language;
mod loader;
mod store;

pub use catalog::{parse_catalog, CatalogFormat, CatalogParseError, CountryTranslations};
pub use error::I18nError;
pub use language::LanguageCode;
pub use loader::{DirLoader, MemoryLoader, TranslationLoader};
pub use store::{TranslationStore, DEFAULT_LANGUAGE};
