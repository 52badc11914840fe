//! News search
//!
//! The [`NewsSource`] trait is the search capability the digest depends on.
//! Search APIs disagree on envelope shape, so every response passes through
//! [`SearchResponse`] before it becomes a list of [`Article`]s.

pub mod finlight;

pub use finlight::FinlightClient;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::types::{Article, RawArticle};
use async_trait::async_trait;
use serde_json::Value;

/// Keyword search over a news API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Articles matching `query`, in the order the API returned them
    async fn search(&self, query: &str, language: &str) -> Result<Vec<Article>>;
}

/// Envelope shapes accepted from a search endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// The body itself is the article list
    List(Vec<Value>),
    /// `{ "articles": [...] }`
    Articles(Vec<Value>),
    /// `{ "data": [...] }`
    Data(Vec<Value>),
    /// `{ "results": [...] }`
    Results(Vec<Value>),
    Unrecognized,
}

impl SearchResponse {
    /// Classify a response body; `articles` wins over `data` over `results`
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Array(items) => SearchResponse::List(items),
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("articles") {
                    SearchResponse::Articles(items)
                } else if let Some(Value::Array(items)) = map.remove("data") {
                    SearchResponse::Data(items)
                } else if let Some(Value::Array(items)) = map.remove("results") {
                    SearchResponse::Results(items)
                } else {
                    SearchResponse::Unrecognized
                }
            }
            _ => SearchResponse::Unrecognized,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            SearchResponse::List(_) => "list",
            SearchResponse::Articles(_) => "articles",
            SearchResponse::Data(_) => "data",
            SearchResponse::Results(_) => "results",
            SearchResponse::Unrecognized => "unrecognized",
        }
    }

    /// Normalize into articles, dropping records that cannot be read or
    /// carry no link. An unrecognized envelope yields nothing.
    pub fn into_articles(self) -> Vec<Article> {
        let items = match self {
            SearchResponse::List(items)
            | SearchResponse::Articles(items)
            | SearchResponse::Data(items)
            | SearchResponse::Results(items) => items,
            SearchResponse::Unrecognized => {
                tracing::warn!("Unrecognized search response shape, treating as empty");
                return Vec::new();
            }
        };

        let total = items.len();
        let articles: Vec<Article> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawArticle>(item) {
                Ok(raw) => raw.into_article(),
                Err(e) => {
                    tracing::debug!("Skipping unreadable article record: {}", e);
                    None
                }
            })
            .collect();

        if articles.len() < total {
            tracing::debug!("Dropped {} of {} article records", total - articles.len(), total);
        }
        articles
    }
}

/// Shortcut for `SearchResponse::from_value(body).into_articles()`
pub fn normalize_response(body: Value) -> Vec<Article> {
    SearchResponse::from_value(body).into_articles()
}
