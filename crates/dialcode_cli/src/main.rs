//! Dialcode CLI
//!
//! Inspect country-name catalogs and watch the overlay translate a headless
//! phone widget:
//!
//! - `dialcode show fr` prints the mapping the overlay would use for `fr`
//! - `dialcode demo fr --countries us,de` opens the widget's dropdown and
//!   prints its markup once the overlay has patched it

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialcode_dom::Document;
use dialcode_i18n::{DirLoader, LanguageCode, TranslationStore};
use dialcode_overlay::{AttachmentState, PhoneInputTranslation, PhoneInputWidget, WidgetConfig, COUNTRIES};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DialcodeConfig;

/// Localized country names for a third-party phone input
#[derive(Parser, Debug)]
#[command(name = "dialcode")]
#[command(about = "Localized country names for a third-party phone input")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./dialcode.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the country translations resolved for a language, as JSON
    Show {
        /// Language code (e.g. "fr")
        language: String,
    },

    /// Open a headless phone widget and print its translated dropdown
    Demo {
        /// Language code (e.g. "fr")
        language: String,

        /// Only render these countries (comma-separated codes)
        #[arg(long, value_delimiter = ',')]
        countries: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DialcodeConfig::load(cli.config.as_deref())?;
    let store = Arc::new(
        TranslationStore::new(DirLoader::new(&config.translations.dir))
            .with_default_language(config.translations.default_language.as_str())
            .with_cache_capacity(config.translations.cache_capacity),
    );

    match cli.command {
        Commands::Show { language } => show(&store, &language).await,
        Commands::Demo {
            language,
            countries,
        } => demo(&config, store, &language, &countries).await,
    }
}

async fn show(store: &TranslationStore, language: &str) -> Result<()> {
    let translations = store.load(&LanguageCode::new(language)).await;
    let json = serde_json::to_string_pretty(&translations).context("Failed to serialize translations")?;
    println!("{json}");
    Ok(())
}

async fn demo(
    config: &DialcodeConfig,
    store: Arc<TranslationStore>,
    language: &str,
    countries: &[String],
) -> Result<()> {
    let options = config.overlay_options();

    let mut widget_config = WidgetConfig {
        markup: options.markup.clone(),
        ..Default::default()
    };
    if !countries.is_empty() {
        widget_config.countries = COUNTRIES
            .iter()
            .filter(|c| countries.iter().any(|code| code.eq_ignore_ascii_case(c.code)))
            .copied()
            .collect();
        if widget_config.countries.is_empty() {
            anyhow::bail!("None of the requested countries are known: {}", countries.join(","));
        }
    }
    let settle = widget_config.render_delay + options.recheck_delay * 2;

    let doc = Document::new();
    let container = doc.create_element("div");
    doc.append_child(doc.root(), container)?;
    let widget = PhoneInputWidget::mount(&doc, container, widget_config).context("Failed to mount widget")?;

    let mut overlay = PhoneInputTranslation::with_options(doc.clone(), store, options);
    overlay.attach(Some(container), Some(LanguageCode::new(language)));
    let state = overlay.wait_armed().await;
    if state != AttachmentState::Armed {
        anyhow::bail!("Overlay did not arm (state: {state:?})");
    }
    info!(
        language,
        translations = overlay.translations().len(),
        "overlay armed"
    );

    widget.toggle()?;
    tokio::time::sleep(settle).await;

    let dropdown = widget.dropdown().context("Dropdown did not render")?;
    let html = doc.outer_html(dropdown).context("Dropdown was removed")?;
    println!("{html}");

    overlay.detach();
    Ok(())
}
