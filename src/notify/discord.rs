//! Discord webhook client

use super::{Webhook, WebhookMessage};
use crate::config::DiscordConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::borrow::Cow;
use std::time::Duration;

#[derive(Clone)]
pub struct DiscordWebhook {
    http: Client,
    url: String,
    username: Option<String>,
}

impl DiscordWebhook {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.webhook_url.clone(),
            username: config.username.clone(),
        })
    }

    /// Apply the configured display name unless the message sets its own
    fn prepare<'a>(&self, message: &'a WebhookMessage) -> Cow<'a, WebhookMessage> {
        match (&self.username, &message.username) {
            (Some(name), None) => {
                let mut owned = message.clone();
                owned.username = Some(name.clone());
                Cow::Owned(owned)
            }
            _ => Cow::Borrowed(message),
        }
    }
}

#[async_trait]
impl Webhook for DiscordWebhook {
    async fn post(&self, message: &WebhookMessage) -> Result<()> {
        let body = self.prepare(message);
        let resp = self.http.post(&self.url).json(&*body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Webhook {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(username: Option<&str>) -> DiscordWebhook {
        DiscordWebhook::new(&DiscordConfig {
            webhook_url: "http://127.0.0.1:9/api/webhooks/1/abc".to_string(),
            username: username.map(str::to_string),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_prepare_applies_configured_username() {
        let hook = webhook(Some("Market Bot"));
        let message = WebhookMessage::text("hello");
        let prepared = hook.prepare(&message);
        assert_eq!(prepared.username.as_deref(), Some("Market Bot"));
        assert!(matches!(prepared, Cow::Owned(_)));
    }

    #[test]
    fn test_prepare_keeps_message_username() {
        let hook = webhook(Some("Market Bot"));
        let mut message = WebhookMessage::text("hello");
        message.username = Some("Override".to_string());
        let prepared = hook.prepare(&message);
        assert_eq!(prepared.username.as_deref(), Some("Override"));
        assert!(matches!(prepared, Cow::Borrowed(_)));
    }

    #[test]
    fn test_prepare_without_username() {
        let hook = webhook(None);
        let message = WebhookMessage::text("hello");
        assert!(hook.prepare(&message).username.is_none());
    }

    #[tokio::test]
    async fn test_post_unreachable_is_http_error() {
        let hook = webhook(None);
        let err = hook.post(&WebhookMessage::text("hello")).await.unwrap_err();
        assert!(matches!(err, BotError::Http(_)));
    }
}
