//! Configuration management
//!
//! Settings come from an optional TOML file, overridden by `NEWS_BOT__*`
//! environment variables. Secrets are read from `FINLIGHT_API_KEY` and
//! `DISCORD_WEBHOOK_URL` (a `.env` file is honored) and never written back.

use crate::error::{BotError, Result};
use crate::scheduler::CronSchedule;
use chrono_tz::Tz;
use config::{Environment, File, FileFormat};
use serde::Deserialize;

pub const API_KEY_ENV: &str = "FINLIGHT_API_KEY";
pub const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// News search API settings
#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_news_base_url(),
            api_key: String::new(),
            queries: default_queries(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Discord webhook settings
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: String,
    /// Overrides the webhook's display name
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: None,
            embed_color: default_embed_color(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DiscordConfig {
    pub fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(BotError::Config(format!(
                "discord webhook url is not set (export {})",
                WEBHOOK_URL_ENV
            )));
        }
        if !self.webhook_url.starts_with("http://") && !self.webhook_url.starts_with("https://") {
            return Err(BotError::Config(
                "discord webhook url must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }
}

/// Article selection settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_max_articles")]
    pub max_articles_per_update: usize,
    /// Pause between two article posts, in milliseconds
    #[serde(default = "default_delivery_delay_ms")]
    pub delivery_delay_ms: u64,
    /// Keep a failed post in the sent history so later runs skip it
    #[serde(default)]
    pub record_failed_deliveries: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_articles_per_update: default_max_articles(),
            delivery_delay_ms: default_delivery_delay_ms(),
            record_failed_deliveries: false,
        }
    }
}

/// Scheduled update slots and the daily history reset
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    #[serde(default = "default_initial_label")]
    pub initial_label: String,
    #[serde(default = "default_slots")]
    pub slots: Vec<SlotConfig>,
    #[serde(default = "default_reset_cron")]
    pub reset_cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            run_on_startup: true,
            initial_label: default_initial_label(),
            slots: default_slots(),
            reset_cron: default_reset_cron(),
        }
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| BotError::Config(format!("unknown timezone: {}", self.timezone)))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlotConfig {
    pub label: String,
    pub cron: String,
}

impl SlotConfig {
    fn new(label: &str, cron: &str) -> Self {
        Self {
            label: label.to_string(),
            cron: cron.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = shellexpand::tilde(path).into_owned();
        let mut config = Self::from_sources(&path, env_overrides())?;
        config.apply_secrets(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(WEBHOOK_URL_ENV).ok(),
        );

        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Merge a TOML file (optional) with `env` overrides
    pub(crate) fn from_sources(path: &str, env: Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(env)
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Fill secrets; empty values leave the file setting untouched
    pub fn apply_secrets(&mut self, api_key: Option<String>, webhook_url: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.news.api_key = key;
        }
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            self.discord.webhook_url = url;
        }
    }

    /// Check everything a scheduled run needs
    pub fn validate(&self) -> Result<()> {
        if self.news.api_key.trim().is_empty() {
            return Err(BotError::Config(format!(
                "news api key is not set (export {})",
                API_KEY_ENV
            )));
        }
        self.discord.validate()?;

        if self.news.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(BotError::Config("at least one search query is required".into()));
        }
        if self.notifier.max_articles_per_update == 0 {
            return Err(BotError::Config(
                "max_articles_per_update must be at least 1".into(),
            ));
        }

        self.schedule.tz()?;
        for slot in &self.schedule.slots {
            CronSchedule::parse(&slot.cron)
                .map_err(|e| BotError::Config(format!("slot '{}': {}", slot.label, e)))?;
        }
        CronSchedule::parse(&self.schedule.reset_cron)
            .map_err(|e| BotError::Config(format!("reset_cron: {}", e)))?;

        Ok(())
    }
}

/// `NEWS_BOT__<SECTION>__<KEY>` variables; `news.queries` takes a
/// comma-separated list
pub(crate) fn env_overrides() -> Environment {
    Environment::with_prefix("NEWS_BOT")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("news.queries")
}

fn default_news_base_url() -> String {
    "https://api.finlight.me".to_string()
}

fn default_queries() -> Vec<String> {
    ["S&P 500", "ES futures", "SPX", "SPY ETF"]
        .iter()
        .map(|q| q.to_string())
        .collect()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_embed_color() -> u32 {
    3447003
}

fn default_max_articles() -> usize {
    5
}

fn default_delivery_delay_ms() -> u64 {
    1000
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_true() -> bool {
    true
}

fn default_initial_label() -> String {
    "Initial Update".to_string()
}

fn default_slots() -> Vec<SlotConfig> {
    vec![
        SlotConfig::new("Market Open (9:30 AM EST)", "30 9 * * 1-5"),
        SlotConfig::new("Mid-Day (12:00 PM EST)", "0 12 * * 1-5"),
        SlotConfig::new("Market Close (5:00 PM EST)", "0 17 * * 1-5"),
    ]
}

fn default_reset_cron() -> String {
    "0 0 * * *".to_string()
}
