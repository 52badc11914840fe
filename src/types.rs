//! Core types for news articles

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Source name used when an article carries neither `source` nor `publisher`
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Unix timestamps above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// A news article normalized from whatever shape the search API returned
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Article URL, used as the dedup identifier
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("No Title")
    }

    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or("No description available")
    }
}

/// Publisher as reported by the API: either a bare name or `{ "name": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceField {
    Name(String),
    Named { name: String },
    Other(serde_json::Value),
}

impl SourceField {
    fn into_name(self) -> Option<String> {
        match self {
            SourceField::Name(name) | SourceField::Named { name } => non_empty(Some(name)),
            SourceField::Other(_) => None,
        }
    }
}

/// Publication time as reported by the API: a date string or a Unix timestamp
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampField {
    Unix(i64),
    Text(String),
    Other(serde_json::Value),
}

impl TimestampField {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            TimestampField::Unix(n) if *n > MILLIS_THRESHOLD => Utc.timestamp_millis_opt(*n).single(),
            TimestampField::Unix(n) => Utc.timestamp_opt(*n, 0).single(),
            TimestampField::Text(s) => parse_timestamp(s),
            TimestampField::Other(_) => None,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, TimestampField::Text(s) if s.trim().is_empty())
    }
}

/// Article record exactly as the search API sends it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub url: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub source: Option<SourceField>,
    pub publisher: Option<SourceField>,
    pub published_at: Option<TimestampField>,
    pub date: Option<TimestampField>,
}

impl RawArticle {
    /// Collapse field aliases into an [`Article`].
    ///
    /// Returns `None` when the record has no usable link, since such an
    /// article can be neither deduplicated nor opened.
    pub fn into_article(self) -> Option<Article> {
        let id = non_empty(self.url).or_else(|| non_empty(self.link))?;

        let source = self
            .source
            .and_then(SourceField::into_name)
            .or_else(|| self.publisher.and_then(SourceField::into_name))
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        let published_at = match (&self.published_at, &self.date) {
            (Some(ts), _) if !ts.is_blank() => ts.to_datetime(),
            (_, Some(ts)) => ts.to_datetime(),
            _ => None,
        };

        Some(Article {
            id,
            title: non_empty(self.title),
            description: non_empty(self.description).or_else(|| non_empty(self.summary)),
            source,
            published_at,
        })
    }
}

/// Parse the date formats news APIs commonly emit; naive values are UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
