use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

const MAX_CATALOG_ENTRIES: usize = 10_000;
const MAX_KEY_BYTES: usize = 128;
const MAX_VALUE_BYTES: usize = 16 * 1024;

/// Country code -> localized country name.
///
/// Immutable once built; clones share the same storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountryTranslations {
    entries: Arc<BTreeMap<String, String>>,
}

impl CountryTranslations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Localized name for a country code, exactly as the widget emits it
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(|s| s.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by country code
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a catalog source in the given format
    pub fn parse(src: &str, format: CatalogFormat) -> Result<Self, CatalogParseError> {
        parse_catalog(src, format)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CountryTranslations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: Arc::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for CountryTranslations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// On-disk catalog encodings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Recognize a file extension (`json`, `yaml`, `yml`)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Extensions tried, in order, when looking a language up on disk
    pub const SEARCH_ORDER: [(&'static str, CatalogFormat); 3] = [
        ("json", CatalogFormat::Json),
        ("yaml", CatalogFormat::Yaml),
        ("yml", CatalogFormat::Yaml),
    ];
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogParseError {
    #[error("json catalog error: {0}")]
    Json(String),

    #[error("yaml catalog error: {0}")]
    Yaml(String),

    #[error("catalog must be a mapping of country code to name")]
    NotAMapping,

    #[error("too many entries (max 10000)")]
    TooManyEntries,
}

/// Why a single entry was left out of a catalog
fn reject_entry(key: &str, value: Option<&str>) -> Option<&'static str> {
    if key.is_empty() || key.len() > MAX_KEY_BYTES {
        return Some("key is empty or longer than 128 bytes");
    }
    match value {
        None => Some("value is not a string"),
        Some("") => Some("value is empty"),
        Some(v) if v.len() > MAX_VALUE_BYTES => Some("value is longer than 16 KiB"),
        Some(_) => None,
    }
}

/// Keep `key -> value` unless the entry is unusable. A bad entry is skipped
/// on its own; the rest of the catalog still loads.
fn insert_entry(out: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    match (reject_entry(key, value), value) {
        (None, Some(value)) => {
            out.insert(key.to_string(), value.to_string());
        }
        (reason, _) => warn!(key, reason = reason.unwrap_or("invalid"), "skipping catalog entry"),
    }
}

fn parse_json(src: &str) -> Result<BTreeMap<String, String>, CatalogParseError> {
    let value: serde_json::Value =
        serde_json::from_str(src).map_err(|e| CatalogParseError::Json(e.to_string()))?;
    let serde_json::Value::Object(mut map) = value else {
        return Err(CatalogParseError::NotAMapping);
    };

    // Bundled modules sometimes wrap the mapping as `{ "default": { ... } }`.
    if map.len() == 1 && map.get("default").is_some_and(|v| v.is_object()) {
        if let Some(serde_json::Value::Object(inner)) = map.remove("default") {
            map = inner;
        }
    }

    if map.len() > MAX_CATALOG_ENTRIES {
        return Err(CatalogParseError::TooManyEntries);
    }
    let mut out = BTreeMap::new();
    for (key, value) in &map {
        insert_entry(&mut out, key, value.as_str());
    }
    Ok(out)
}

fn parse_yaml(src: &str) -> Result<BTreeMap<String, String>, CatalogParseError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(src).map_err(|e| CatalogParseError::Yaml(e.to_string()))?;
    let serde_yaml::Value::Mapping(raw) = value else {
        return Err(CatalogParseError::NotAMapping);
    };
    if raw.len() > MAX_CATALOG_ENTRIES {
        return Err(CatalogParseError::TooManyEntries);
    }
    let mut out = BTreeMap::new();
    for (k, v) in &raw {
        match k.as_str() {
            Some(key) => insert_entry(&mut out, key, v.as_str()),
            None => warn!(key = ?k, "skipping catalog entry with a non-string key"),
        }
    }
    Ok(out)
}

/// Parse a country-name catalog: a flat mapping of country code to name.
pub fn parse_catalog(src: &str, format: CatalogFormat) -> Result<CountryTranslations, CatalogParseError> {
    let entries = match format {
        CatalogFormat::Json => parse_json(src)?,
        CatalogFormat::Yaml => parse_yaml(src)?,
    };
    Ok(CountryTranslations {
        entries: Arc::new(entries),
    })
}
