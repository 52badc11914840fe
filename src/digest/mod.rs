//! Market news digest
//!
//! One run posts a header, searches every configured query, merges and
//! deduplicates the results newest-first, and delivers up to a capped number
//! of articles, never two from the same source and never one already sent
//! since the last history reset.


use crate::config::Config;
use crate::error::Result;
use crate::news::NewsSource;
use crate::notify::{self, Webhook, WebhookMessage};
use crate::scheduler::{JobHandler, JobKind};
use crate::types::Article;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Knobs for a digest run
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub queries: Vec<String>,
    pub language: String,
    pub max_articles: usize,
    /// Pause between two article posts
    pub delivery_delay: Duration,
    pub embed_color: u32,
    /// Keep a failed post in the sent history so later runs skip it too
    pub record_failed_deliveries: bool,
}

impl DigestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            queries: config
                .news
                .queries
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
            language: config.news.language.clone(),
            max_articles: config.notifier.max_articles_per_update,
            delivery_delay: Duration::from_millis(config.notifier.delivery_delay_ms),
            embed_color: config.discord.embed_color,
            record_failed_deliveries: config.notifier.record_failed_deliveries,
        }
    }
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of one run, for logs and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub label: String,
    /// Articles returned across all queries, duplicates included
    pub fetched: usize,
    pub unique: usize,
    /// Articles the webhook accepted
    pub delivered: usize,
    pub failed_deliveries: usize,
    pub failed_queries: usize,
    /// The run stopped early on an error
    pub aborted: bool,
}

#[derive(Debug, Default)]
struct History {
    /// Article ids delivered since the last reset
    sent: HashSet<String>,
    /// Sources used by the run in progress
    sources_this_run: HashSet<String>,
}

pub struct MarketNewsNotifier {
    news: Arc<dyn NewsSource>,
    webhook: Arc<dyn Webhook>,
    settings: DigestSettings,
    history: Mutex<History>,
}

impl MarketNewsNotifier {
    pub fn new(news: Arc<dyn NewsSource>, webhook: Arc<dyn Webhook>, settings: DigestSettings) -> Self {
        Self {
            news,
            webhook,
            settings,
            history: Mutex::new(History::default()),
        }
    }

    pub fn settings(&self) -> &DigestSettings {
        &self.settings
    }

    /// Run one update for `label`. Never fails: errors are logged and
    /// reported to the webhook on a best-effort basis.
    pub async fn run(&self, label: &str) -> RunSummary {
        info!("Running {} update...", label);
        let mut summary = RunSummary {
            label: label.to_string(),
            ..Default::default()
        };

        match self.run_inner(label, &mut summary).await {
            Ok(()) => {
                info!(
                    "Completed {} update - Sent {} articles ({} fetched, {} unique)",
                    label, summary.delivered, summary.fetched, summary.unique
                );
            }
            Err(e) => {
                error!("Error in {} update: {}", label, e);
                summary.aborted = true;
                let notice = notify::error_message(label, &e.to_string());
                if let Err(notify_err) = self.webhook.post(&notice).await {
                    warn!("Failed to report error to webhook: {}", notify_err);
                }
            }
        }

        summary
    }

    async fn run_inner(&self, label: &str, summary: &mut RunSummary) -> Result<()> {
        self.history.lock().await.sources_this_run.clear();

        self.post_notice(&notify::header_message(label)).await?;

        let fetched = self.collect_articles(summary).await;
        summary.fetched = fetched.len();

        let candidates = dedupe_and_sort(fetched);
        summary.unique = candidates.len();

        // Every attempt takes a cap slot and claims its source for this run,
        // so a failing webhook costs at most `max_articles` posts.
        let mut attempts = 0;
        for article in &candidates {
            if attempts >= self.settings.max_articles {
                break;
            }

            {
                let history = self.history.lock().await;
                if history.sent.contains(&article.id)
                    || history.sources_this_run.contains(&article.source)
                {
                    continue;
                }
            }

            if attempts > 0 && !self.settings.delivery_delay.is_zero() {
                tokio::time::sleep(self.settings.delivery_delay).await;
            }
            attempts += 1;

            let ok = self.send_article(article, label).await;
            if ok {
                summary.delivered += 1;
            } else {
                summary.failed_deliveries += 1;
            }

            let mut history = self.history.lock().await;
            history.sources_this_run.insert(article.source.clone());
            if ok || self.settings.record_failed_deliveries {
                history.sent.insert(article.id.clone());
            }
        }

        let nothing_new = if self.settings.record_failed_deliveries {
            attempts == 0
        } else {
            summary.delivered == 0
        };
        if nothing_new {
            self.post_notice(&notify::no_articles_message()).await?;
        }

        Ok(())
    }

    /// Post a text notice. A non-2xx reply is logged and the run goes on;
    /// transport failures propagate.
    async fn post_notice(&self, message: &WebhookMessage) -> Result<()> {
        match self.webhook.post(message).await {
            Err(e) if e.is_remote_rejection() => {
                warn!("Webhook rejected notice: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    /// Search every query; a failing query contributes nothing
    async fn collect_articles(&self, summary: &mut RunSummary) -> Vec<Article> {
        let mut all = Vec::new();
        for query in &self.settings.queries {
            match self.news.search(query, &self.settings.language).await {
                Ok(articles) => {
                    debug!("Query '{}' returned {} articles", query, articles.len());
                    all.extend(articles);
                }
                Err(e) => {
                    error!("Error searching for query \"{}\": {}", query, e);
                    summary.failed_queries += 1;
                }
            }
        }
        all
    }

    /// Post one article embed; returns whether the webhook accepted it
    pub async fn send_article(&self, article: &Article, label: &str) -> bool {
        let embed = notify::article_embed(article, label, self.settings.embed_color, Utc::now());
        match self.webhook.post(&WebhookMessage::embed(embed)).await {
            Ok(()) => {
                debug!("Sent '{}' from {}", article.display_title(), article.source);
                true
            }
            Err(e) => {
                error!("Error sending article {} to webhook: {}", article.id, e);
                false
            }
        }
    }

    /// Forget every sent article; returns how many were cleared
    pub async fn reset_history(&self) -> usize {
        let mut history = self.history.lock().await;
        let cleared = history.sent.len();
        history.sent.clear();
        info!("Cleared article history ({} entries)", cleared);
        cleared
    }

    pub async fn sent_count(&self) -> usize {
        self.history.lock().await.sent.len()
    }

    pub async fn was_sent(&self, id: &str) -> bool {
        self.history.lock().await.sent.contains(id)
    }
}

#[async_trait]
impl JobHandler for MarketNewsNotifier {
    async fn handle(&self, job: &JobKind) {
        match job {
            JobKind::Update { label } => {
                self.run(label).await;
            }
            JobKind::ResetHistory => {
                self.reset_history().await;
            }
        }
    }
}

/// Drop repeated ids (first occurrence wins), then order newest first.
/// Undated articles go last, keeping their relative order.
pub fn dedupe_and_sort(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Article> = articles
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();
    unique.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    unique
}
