//! Dialcode configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dialcode_overlay::{OverlayOptions, WidgetMarkup, DEFAULT_CLASS_PREFIX};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "dialcode.toml";

/// Top-level configuration (dialcode.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DialcodeConfig {
    #[serde(default)]
    pub translations: TranslationsConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
}

/// Where catalogs live and how they are served
#[derive(Debug, Deserialize, Serialize)]
pub struct TranslationsConfig {
    /// Catalog directory (relative to the config file)
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Language used when the requested one can't be loaded
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Languages kept in memory (0 disables caching)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_dir() -> PathBuf {
    PathBuf::from("resource/locales")
}

fn default_language() -> String {
    dialcode_i18n::DEFAULT_LANGUAGE.to_string()
}

fn default_cache_capacity() -> usize {
    8
}

impl Default for TranslationsConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            default_language: default_language(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Overlay timing
#[derive(Debug, Deserialize, Serialize)]
pub struct OverlayConfig {
    /// Delay between a selector click and the re-check, in milliseconds
    #[serde(default = "default_recheck_delay_ms")]
    pub recheck_delay_ms: u64,
    /// Patch an already-open dropdown as soon as translations arrive
    #[serde(default)]
    pub patch_on_arm: bool,
}

fn default_recheck_delay_ms() -> u64 {
    50
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            recheck_delay_ms: default_recheck_delay_ms(),
            patch_on_arm: false,
        }
    }
}

/// Widget class naming
#[derive(Debug, Deserialize, Serialize)]
pub struct MarkupConfig {
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
}

fn default_class_prefix() -> String {
    DEFAULT_CLASS_PREFIX.to_string()
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            class_prefix: default_class_prefix(),
        }
    }
}

impl DialcodeConfig {
    /// Load `path`, or the defaults when `path` is `None` and no
    /// `dialcode.toml` exists in the working directory.
    ///
    /// A relative catalog directory is resolved against the file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let implicit = PathBuf::from(CONFIG_FILE);
                if !implicit.exists() {
                    return Ok(Self::default());
                }
                implicit
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if config.translations.dir.is_relative() {
            if let Some(parent) = config_path.parent() {
                config.translations.dir = parent.join(&config.translations.dir);
            }
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DialcodeConfig = toml::from_str(content)?;
        if config.translations.default_language.trim().is_empty() {
            anyhow::bail!("translations.default_language must not be empty");
        }
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn overlay_options(&self) -> OverlayOptions {
        OverlayOptions {
            recheck_delay: Duration::from_millis(self.overlay.recheck_delay_ms),
            patch_on_arm: self.overlay.patch_on_arm,
            markup: WidgetMarkup::with_prefix(&self.markup.class_prefix),
        }
    }
}
