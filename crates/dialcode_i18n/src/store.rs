use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::catalog::CountryTranslations;
use crate::language::LanguageCode;
use crate::loader::TranslationLoader;
use crate::I18nError;

/// Language used when the requested one cannot be loaded.
pub const DEFAULT_LANGUAGE: &str = "es";

/// Fallback-aware access to country-name translations.
///
/// [`load`](Self::load) is total: a failed load falls back to the default
/// language, and a failed default degrades to an empty mapping. Failures are
/// logged, never returned.
pub struct TranslationStore {
    loader: Arc<dyn TranslationLoader>,
    default_language: LanguageCode,
    /// Memo of direct successes only; fallbacks are never cached under the
    /// requested language so a transient failure can recover.
    cache: Option<Mutex<LruCache<LanguageCode, CountryTranslations>>>,
}

impl TranslationStore {
    pub fn new(loader: impl TranslationLoader + 'static) -> Self {
        Self::from_arc(Arc::new(loader))
    }

    pub fn from_arc(loader: Arc<dyn TranslationLoader>) -> Self {
        Self {
            loader,
            default_language: LanguageCode::new(DEFAULT_LANGUAGE),
            cache: None,
        }
    }

    pub fn with_default_language(mut self, language: impl Into<LanguageCode>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Memoize up to `capacity` languages (0 disables the memo)
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    /// Translations for `language`, falling back to the default language and
    /// then to an empty mapping.
    pub async fn load(&self, language: &LanguageCode) -> CountryTranslations {
        let err = match self.try_load(language).await {
            Ok(translations) => return translations,
            Err(err) => err,
        };
        warn!(
            language = %language,
            error = %err,
            "Failed to load country translations"
        );

        if *language == self.default_language {
            return CountryTranslations::default();
        }

        match self.try_load(&self.default_language).await {
            Ok(translations) => {
                debug!(
                    language = %language,
                    default = %self.default_language,
                    "Using default-language country translations"
                );
                translations
            }
            Err(err) => {
                error!(
                    default = %self.default_language,
                    error = %err,
                    "Failed to load default country translations"
                );
                CountryTranslations::default()
            }
        }
    }

    /// Load without fallback, consulting and filling the memo.
    pub async fn try_load(&self, language: &LanguageCode) -> Result<CountryTranslations, I18nError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().get(language) {
                return Ok(hit.clone());
            }
        }

        let translations = self.loader.load(language).await?;

        if let Some(cache) = &self.cache {
            cache.lock().put(language.clone(), translations.clone());
        }
        Ok(translations)
    }

    /// Forget memoized languages
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
    }
}

impl std::fmt::Debug for TranslationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationStore")
            .field("default_language", &self.default_language)
            .field("cached", &self.cache.as_ref().map(|c| c.lock().len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogFormat;
    use crate::loader::MemoryLoader;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts loads, delegating to a memory loader
    struct Counting {
        inner: MemoryLoader,
        calls: AtomicUsize,
    }

    impl TranslationLoader for Counting {
        fn load<'a>(
            &'a self,
            language: &'a LanguageCode,
        ) -> BoxFuture<'a, Result<CountryTranslations, I18nError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.load(language)
        }
    }

    fn catalogs() -> MemoryLoader {
        MemoryLoader::new()
            .with_json("es", r#"{ "us": "Estados Unidos", "fr": "Francia" }"#)
            .with_json("fr", r#"{ "us": "États-Unis" }"#)
    }

    #[tokio::test]
    async fn loads_requested_language() {
        let store = TranslationStore::new(catalogs());
        let fr = store.load(&"fr".into()).await;
        assert_eq!(fr.get("us"), Some("États-Unis"));
    }

    #[tokio::test]
    async fn unknown_language_falls_back_to_default() {
        let store = TranslationStore::new(catalogs());
        let xx = store.load(&"xx".into()).await;
        let es = store.load(&"es".into()).await;
        assert_eq!(xx, es);
        assert_eq!(xx.get("us"), Some("Estados Unidos"));
    }

    #[tokio::test]
    async fn malformed_language_falls_back_to_default() {
        let mut loader = catalogs();
        loader.insert("de", CatalogFormat::Json, "{ \"us\": ");
        let store = TranslationStore::new(loader);
        assert_eq!(store.load(&"de".into()).await.get("fr"), Some("Francia"));
    }

    #[tokio::test]
    async fn failing_default_yields_empty_mapping() {
        let store = TranslationStore::new(MemoryLoader::new()).with_default_language("es");
        assert!(store.load(&"xx".into()).await.is_empty());
        assert!(store.load(&"es".into()).await.is_empty());
    }

    #[tokio::test]
    async fn memo_only_holds_direct_successes() {
        let loader = Arc::new(Counting {
            inner: catalogs(),
            calls: AtomicUsize::new(0),
        });
        let store = TranslationStore::from_arc(loader.clone()).with_cache_capacity(4);

        store.load(&"fr".into()).await;
        store.load(&"fr".into()).await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

        // "xx" fails every time; only the default is served from the memo
        store.load(&"xx".into()).await;
        store.load(&"xx".into()).await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 4);

        store.clear_cache();
        store.load(&"fr".into()).await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 5);
    }
}
