//! Error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("News API error {status}: {body}")]
    NewsApi { status: u16, body: String },

    #[error("Webhook error {status}: {body}")]
    Webhook { status: u16, body: String },

    #[error("Schedule error: {0}")]
    Schedule(String),
}

impl From<config::ConfigError> for BotError {
    fn from(e: config::ConfigError) -> Self {
        BotError::Config(e.to_string())
    }
}

impl BotError {
    /// Whether the failure came from a remote endpoint answering non-2xx
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, BotError::NewsApi { .. } | BotError::Webhook { .. })
    }
}
