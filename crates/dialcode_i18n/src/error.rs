use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogParseError;
use crate::language::LanguageCode;

#[derive(Debug, Error)]
pub enum I18nError {
    #[error(transparent)]
    Catalog(#[from] CatalogParseError),

    #[error("no translation resource for language `{0}`")]
    NotFound(LanguageCode),

    #[error("invalid language code `{0}`")]
    InvalidLanguage(LanguageCode),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
