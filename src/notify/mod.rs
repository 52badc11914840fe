//! Chat webhook notifications
//!
//! Messages are either plain `content` or a list of `embeds`, the two body
//! forms a Discord-compatible webhook accepts.

pub mod discord;

pub use discord::DiscordWebhook;


use crate::error::Result;
use crate::types::Article;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Discord rejects embeds beyond these lengths
pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;

/// Outbound webhook capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Webhook: Send + Sync {
    /// Deliver one message; a non-2xx answer is an error
    async fn post(&self, message: &WebhookMessage) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl WebhookMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub fn is_embed(&self) -> bool {
        !self.embeds.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    /// ISO 8601 timestamp shown in the embed footer
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: truncate(value, MAX_FIELD_VALUE_CHARS),
            inline: true,
        }
    }
}

/// Embed announcing one article for a scheduled slot
pub fn article_embed(article: &Article, slot: &str, color: u32, sent_at: DateTime<Utc>) -> Embed {
    Embed {
        title: truncate(
            &format!("{} Update: {}", slot, article.display_title()),
            MAX_TITLE_CHARS,
        ),
        description: truncate(article.display_description(), MAX_DESCRIPTION_CHARS),
        url: Some(article.id.clone()),
        color,
        timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        fields: vec![
            EmbedField::inline("Source", &article.source),
            EmbedField::inline("Update Time", slot),
        ],
    }
}

pub fn header_message(slot: &str) -> WebhookMessage {
    WebhookMessage::text(format!("🔔 **{} Market Update** 🔔", slot))
}

pub fn no_articles_message() -> WebhookMessage {
    WebhookMessage::text("No new articles from unique sources for this update.")
}

pub fn error_message(slot: &str, error: &str) -> WebhookMessage {
    WebhookMessage::text(format!("⚠️ Error during {} update: {}", slot, error))
}

/// Cut `s` to at most `max` characters, marking the cut with an ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
