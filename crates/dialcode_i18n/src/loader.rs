use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tracing::debug;

use crate::catalog::{parse_catalog, CatalogFormat, CountryTranslations};
use crate::language::LanguageCode;
use crate::I18nError;

/// Source of translation resources, keyed by language.
///
/// Loaders report failures; the fallback policy lives in
/// [`TranslationStore`](crate::TranslationStore).
pub trait TranslationLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<CountryTranslations, I18nError>>;
}

/// Loads `<dir>/<language>.json` (or `.yaml` / `.yml`).
#[derive(Clone, Debug)]
pub struct DirLoader {
    dir: PathBuf,
}

impl DirLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load_from_dir(&self, language: &LanguageCode) -> Result<CountryTranslations, I18nError> {
        if !language.is_path_safe() {
            return Err(I18nError::InvalidLanguage(language.clone()));
        }

        for (ext, format) in CatalogFormat::SEARCH_ORDER {
            let path = self.dir.join(format!("{language}.{ext}"));
            let src = match tokio::fs::read_to_string(&path).await {
                Ok(src) => src,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(I18nError::Io { path, source }),
            };
            debug!(path = %path.display(), "loading translation catalog");
            return Ok(parse_catalog(&src, format)?);
        }

        Err(I18nError::NotFound(language.clone()))
    }
}

impl TranslationLoader for DirLoader {
    fn load<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<CountryTranslations, I18nError>> {
        Box::pin(self.load_from_dir(language))
    }
}

/// In-memory catalog sources (embedded resources, tests).
///
/// Sources are parsed on every load, so a malformed source fails the same
/// way a malformed file would.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    sources: HashMap<LanguageCode, (CatalogFormat, String)>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: impl Into<LanguageCode>, format: CatalogFormat, src: impl Into<String>) {
        self.sources.insert(language.into(), (format, src.into()));
    }

    pub fn with_json(mut self, language: impl Into<LanguageCode>, src: impl Into<String>) -> Self {
        self.insert(language, CatalogFormat::Json, src);
        self
    }

    pub fn with_yaml(mut self, language: impl Into<LanguageCode>, src: impl Into<String>) -> Self {
        self.insert(language, CatalogFormat::Yaml, src);
        self
    }
}

impl TranslationLoader for MemoryLoader {
    fn load<'a>(
        &'a self,
        language: &'a LanguageCode,
    ) -> BoxFuture<'a, Result<CountryTranslations, I18nError>> {
        Box::pin(async move {
            let (format, src) = self
                .sources
                .get(language)
                .ok_or_else(|| I18nError::NotFound(language.clone()))?;
            Ok(parse_catalog(src, *format)?)
        })
    }
}
