//! Market News Bot
//!
//! Posts a short digest of S&P 500 / ES news to a Discord webhook at fixed
//! times of the trading day.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (cron, America/New_York) → MarketNewsNotifier → Webhook (Discord)
//!                                            ↑
//!                                   NewsSource (Finlight)
//! ```

pub mod config;
pub mod digest;
pub mod error;
pub mod news;
pub mod notify;
pub mod scheduler;
pub mod types;
