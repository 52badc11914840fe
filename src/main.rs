//! Market News Bot
//!
//! Scheduled S&P 500 / ES futures news digest for Discord.

use chrono::Utc;
use clap::{Parser, Subcommand};
use market_news_bot::{
    config::Config,
    digest::{DigestSettings, MarketNewsNotifier},
    news::FinlightClient,
    notify::{DiscordWebhook, Webhook, WebhookMessage},
    scheduler::{JobKind, Scheduler},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "market-news-bot")]
#[command(about = "Scheduled market news digest for Discord webhooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the initial update, then follow the schedule
    Run {
        /// Skip the update normally sent at startup
        #[arg(long)]
        no_initial: bool,
    },
    /// Run a single update and exit
    Once {
        /// Slot label shown in the posted messages
        #[arg(short, long, default_value = "Initial Update")]
        slot: String,
    },
    /// Show when each scheduled job fires next
    Schedule,
    /// Test webhook notification
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { no_initial } => run_bot(config, no_initial).await,
        Commands::Once { slot } => run_once(config, &slot).await,
        Commands::Schedule => show_schedule(config),
        Commands::TestNotify => test_notify(config).await,
    }
}

fn build_notifier(config: &Config) -> anyhow::Result<MarketNewsNotifier> {
    let news = Arc::new(FinlightClient::new(&config.news)?);
    let webhook = Arc::new(DiscordWebhook::new(&config.discord)?);
    Ok(MarketNewsNotifier::new(
        news,
        webhook,
        DigestSettings::from_config(config),
    ))
}

async fn run_bot(config: Config, no_initial: bool) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("Starting market news bot");

    let notifier = build_notifier(&config)?;
    let scheduler = Scheduler::from_config(&config.schedule)?;

    if config.schedule.run_on_startup && !no_initial {
        tracing::info!("Running initial update...");
        notifier.run(&config.schedule.initial_label).await;
    }

    tracing::info!(
        "Market news monitoring started ({} queries, timezone {})",
        notifier.settings().queries.len(),
        scheduler.timezone()
    );
    for job in scheduler.jobs() {
        tracing::info!("- {}: {}", job.kind.describe(), job.schedule);
    }

    scheduler
        .run(&notifier, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Market news bot stopped");
    Ok(())
}

async fn run_once(config: Config, slot: &str) -> anyhow::Result<()> {
    config.validate()?;
    let notifier = build_notifier(&config)?;
    let summary = notifier.run(slot).await;

    println!(
        "\n📰 {}: sent {} of {} unique articles ({} fetched, {} failed queries, {} failed posts)",
        summary.label,
        summary.delivered,
        summary.unique,
        summary.fetched,
        summary.failed_queries,
        summary.failed_deliveries
    );
    if summary.aborted {
        anyhow::bail!("update '{}' aborted, see log for details", slot);
    }
    Ok(())
}

fn show_schedule(config: Config) -> anyhow::Result<()> {
    let scheduler = Scheduler::from_config(&config.schedule)?;
    let tz = scheduler.timezone();
    let now = Utc::now();

    println!("\n🗓  Schedule ({})\n", tz);
    println!("{:<32} {:<14} {}", "Job", "Cron", "Next run");
    println!("{}", "-".repeat(72));

    for job in scheduler.jobs() {
        let next = job
            .schedule
            .next_after(now, tz)
            .map(|at| at.with_timezone(&tz).format("%a %Y-%m-%d %H:%M %Z").to_string())
            .unwrap_or_else(|| "never".to_string());
        let name = match &job.kind {
            JobKind::Update { .. } => job.kind.describe().to_string(),
            JobKind::ResetHistory => format!("[{}]", job.kind.describe()),
        };
        println!("{:<32} {:<14} {}", name, job.schedule.expr(), next);
    }

    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    config.discord.validate()?;
    let webhook = DiscordWebhook::new(&config.discord)?;

    webhook
        .post(&WebhookMessage::text(
            "🧪 **Test Notification**\n\nIf you see this, the webhook integration is working!",
        ))
        .await?;

    println!("✅ Test notification sent!");
    Ok(())
}
