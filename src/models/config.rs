//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// CSS selectors for the search and detail pages
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Storage backend settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification channel settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Identity key derivation settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override secrets and endpoints from the environment.
    ///
    /// Recognized variables: `FLATWATCH_BOT_TOKEN`, `FLATWATCH_CHANNEL_ID`,
    /// `FLATWATCH_DEBUG_CHANNEL_ID`, `FLATWATCH_DATABASE_URL`,
    /// `FLATWATCH_SEARCH_URL`.
    pub fn apply_env(&mut self) {
        if let Ok(token) = env::var("FLATWATCH_BOT_TOKEN") {
            self.notify.bot_token = token;
        }
        if let Ok(chat) = env::var("FLATWATCH_CHANNEL_ID") {
            self.notify.channel_id = chat;
        }
        if let Ok(chat) = env::var("FLATWATCH_DEBUG_CHANNEL_ID") {
            self.notify.debug_channel_id = chat;
        }
        if let Ok(url) = env::var("FLATWATCH_DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Ok(url) = env::var("FLATWATCH_SEARCH_URL") {
            self.scrape.search_url = url;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scrape.search_url.trim().is_empty() {
            return Err(AppError::validation("scrape.search_url is empty"));
        }
        if self.scrape.user_agent.trim().is_empty() {
            return Err(AppError::validation("scrape.user_agent is empty"));
        }
        if self.scrape.timeout_secs == 0 {
            return Err(AppError::validation("scrape.timeout_secs must be > 0"));
        }
        if self.storage.database_url.trim().is_empty() {
            return Err(AppError::validation("storage.database_url is empty"));
        }
        if self.identity.max_key_len == 0 {
            return Err(AppError::validation("identity.max_key_len must be > 0"));
        }
        if self.notify.channel_id.trim().is_empty() {
            return Err(AppError::validation("notify.channel_id is empty"));
        }
        if self.notify.debug_channel_id.trim().is_empty() {
            return Err(AppError::validation("notify.debug_channel_id is empty"));
        }
        Ok(())
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Search-results URL defining one scrape target
    #[serde(default)]
    pub search_url: String,

    /// Base URL for resolving relative listing links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pacing delay between listings in milliseconds
    #[serde(default = "defaults::listing_delay")]
    pub listing_delay_ms: u64,

    /// Longer pacing delay after media capture in milliseconds
    #[serde(default = "defaults::media_delay")]
    pub media_delay_ms: u64,

    /// Interval between scrape cycles in seconds (watch mode)
    #[serde(default = "defaults::cycle_interval")]
    pub cycle_interval_secs: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: String::new(),
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            listing_delay_ms: defaults::listing_delay(),
            media_delay_ms: defaults::media_delay(),
            cycle_interval_secs: defaults::cycle_interval(),
        }
    }
}

/// CSS selectors for the search-results page and the listing detail page.
///
/// The selection strategy lives entirely in configuration; the source
/// only depends on the extracted field shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Result-page article elements
    #[serde(default = "defaults::sel_article")]
    pub article: String,

    /// Attribute on the article element carrying the listing link
    #[serde(default = "defaults::sel_article_link_attr")]
    pub article_link_attr: String,

    /// Result-page posting count banner
    #[serde(default = "defaults::sel_count_banner")]
    pub count_banner: String,

    /// Delimiter splitting the count banner, total comes after it
    #[serde(default = "defaults::count_split")]
    pub count_split: String,

    /// Detail-page title
    #[serde(default = "defaults::sel_title")]
    pub title: String,

    /// Detail-page attribute labels
    #[serde(default = "defaults::sel_detail_label")]
    pub detail_label: String,

    /// Detail-page attribute values
    #[serde(default = "defaults::sel_detail_value")]
    pub detail_value: String,

    /// Detail-page feature tags
    #[serde(default = "defaults::sel_checktag")]
    pub checktag: String,

    /// Detail-page view counter
    #[serde(default = "defaults::sel_views")]
    pub views: String,

    /// Detail-page posting date
    #[serde(default = "defaults::sel_date")]
    pub date: String,

    /// Detail-page street address
    #[serde(default = "defaults::sel_street")]
    pub street: String,

    /// Detail-page locality
    #[serde(default = "defaults::sel_locality")]
    pub locality: String,

    /// Detail-page gallery images
    #[serde(default = "defaults::sel_image")]
    pub image: String,

    /// Attribute on the gallery image element carrying the URL
    #[serde(default = "defaults::sel_image_attr")]
    pub image_attr: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            article: defaults::sel_article(),
            article_link_attr: defaults::sel_article_link_attr(),
            count_banner: defaults::sel_count_banner(),
            count_split: defaults::count_split(),
            title: defaults::sel_title(),
            detail_label: defaults::sel_detail_label(),
            detail_value: defaults::sel_detail_value(),
            checktag: defaults::sel_checktag(),
            views: defaults::sel_views(),
            date: defaults::sel_date(),
            street: defaults::sel_street(),
            locality: defaults::sel_locality(),
            image: defaults::sel_image(),
            image_attr: defaults::sel_image_attr(),
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database connection URL
    #[serde(default = "defaults::database_url")]
    pub database_url: String,

    /// Directory for captured location images
    #[serde(default = "defaults::image_dir")]
    pub image_dir: String,

    /// Whether to capture one location image per listing
    #[serde(default)]
    pub capture_images: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::database_url(),
            image_dir: defaults::image_dir(),
            capture_images: false,
        }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Bot API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Bot token (usually supplied via FLATWATCH_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: String,

    /// Primary announcement channel
    #[serde(default)]
    pub channel_id: String,

    /// Diagnostic channel for operator-facing status and errors
    #[serde(default)]
    pub debug_channel_id: String,

    /// Announcement text template, see [`Listing::format`](crate::models::Listing::format)
    #[serde(default = "defaults::announcement_template")]
    pub template: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            bot_token: String::new(),
            channel_id: String::new(),
            debug_channel_id: String::new(),
            template: defaults::announcement_template(),
        }
    }
}

/// Identity key derivation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Key strategy: "encoded-title" or "sha256"
    #[serde(default = "defaults::key_strategy")]
    pub strategy: String,

    /// Maximum key length after encoding (unique-index width limit)
    #[serde(default = "defaults::max_key_len")]
    pub max_key_len: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            strategy: defaults::key_strategy(),
            max_key_len: defaults::max_key_len(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum console log level
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Scrape defaults
    pub fn base_url() -> String {
        "https://www.kleinanzeigen.de".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; flatwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn listing_delay() -> u64 {
        1000
    }
    pub fn media_delay() -> u64 {
        10_000
    }
    pub fn cycle_interval() -> u64 {
        1800
    }

    // Selector defaults, matching the classifieds site's detail pages
    pub fn sel_article() -> String {
        "article".into()
    }
    pub fn sel_article_link_attr() -> String {
        "data-href".into()
    }
    pub fn sel_count_banner() -> String {
        ".breadcrump-summary".into()
    }
    pub fn count_split() -> String {
        " von ".into()
    }
    pub fn sel_title() -> String {
        "#viewad-title".into()
    }
    pub fn sel_detail_label() -> String {
        "li.addetailslist--detail".into()
    }
    pub fn sel_detail_value() -> String {
        "span.addetailslist--detail--value".into()
    }
    pub fn sel_checktag() -> String {
        "li.checktag".into()
    }
    pub fn sel_views() -> String {
        "#viewad-cntr-num".into()
    }
    pub fn sel_date() -> String {
        "#viewad-extra-info > :first-child".into()
    }
    pub fn sel_street() -> String {
        "#street-address".into()
    }
    pub fn sel_locality() -> String {
        "#viewad-locality".into()
    }
    pub fn sel_image() -> String {
        "#viewad-image".into()
    }
    pub fn sel_image_attr() -> String {
        "src".into()
    }

    // Storage defaults
    pub fn database_url() -> String {
        "sqlite://flatwatch.db?mode=rwc".into()
    }
    pub fn image_dir() -> String {
        "images".into()
    }

    // Notify defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn announcement_template() -> String {
        "Eine neue Wohnung ist seit {date} online und hat bereits {views} Aufrufe!\n\n\
         Der Titel lautet \"{title}\" und sie befindet sich in {location}.\n\n\
         Weitere Details:\n{details}\n\n\
         Folgende zusätzliche Infos habe ich gefunden:\n{checktags}\n\n\
         Du findest sie unter {url}\n"
            .into()
    }

    // Identity defaults
    pub fn key_strategy() -> String {
        "encoded-title".into()
    }
    pub fn max_key_len() -> usize {
        150
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
