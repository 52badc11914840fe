//! Finlight news API client

use super::{NewsSource, SearchResponse};
use crate::config::NewsConfig;
use crate::error::{BotError, Result};
use crate::types::Article;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ArticleQuery<'a> {
    query: &'a str,
    language: &'a str,
}

#[derive(Clone)]
pub struct FinlightClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl FinlightClient {
    pub fn new(config: &NewsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn articles_url(&self) -> String {
        format!("{}/v1/articles", self.base_url)
    }
}

#[async_trait]
impl NewsSource for FinlightClient {
    async fn search(&self, query: &str, language: &str) -> Result<Vec<Article>> {
        let resp = self
            .http
            .post(self.articles_url())
            .header("X-API-KEY", &self.api_key)
            .json(&ArticleQuery { query, language })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::NewsApi {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        let response = SearchResponse::from_value(body);
        debug!("Finlight '{}' answered with {} shape", query, response.shape());
        Ok(response.into_articles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_articles_url_trims_slash() {
        let config = NewsConfig {
            base_url: "https://api.finlight.me/".to_string(),
            ..Default::default()
        };
        let client = FinlightClient::new(&config).unwrap();
        assert_eq!(client.articles_url(), "https://api.finlight.me/v1/articles");
    }

    #[test]
    fn test_query_body() {
        let body = serde_json::to_value(ArticleQuery {
            query: "S&P 500",
            language: "en",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "query": "S&P 500", "language": "en" }));
    }

    #[tokio::test]
    async fn test_search_unreachable_host_is_http_error() {
        let config = NewsConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = FinlightClient::new(&config).unwrap();
        let err = client.search("SPX", "en").await.unwrap_err();
        assert!(matches!(err, BotError::Http(_)));
    }
}
