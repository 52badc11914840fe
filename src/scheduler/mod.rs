//! Calendar scheduling of digest runs
//!
//! Jobs are cron expressions evaluated in one named timezone. The loop
//! sleeps until the earliest due instant, hands every job due then to a
//! [`JobHandler`] one after another, and recomputes. Instants that pass while
//! a job is still running are skipped, not replayed.

pub mod cron;

pub use cron::CronSchedule;


use crate::config::ScheduleConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::time::Duration;

/// What a job does when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Run a digest update under this slot label
    Update { label: String },
    /// Forget which articles were already sent
    ResetHistory,
}

impl JobKind {
    pub fn describe(&self) -> &str {
        match self {
            JobKind::Update { label } => label,
            JobKind::ResetHistory => "Reset article history",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub schedule: CronSchedule,
    pub kind: JobKind,
}

/// Receives jobs as they fall due
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobKind);
}

pub struct Scheduler {
    tz: Tz,
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new(tz: Tz) -> Self {
        Self { tz, jobs: Vec::new() }
    }

    /// Build the update slots and the daily reset from configuration
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let mut scheduler = Self::new(config.tz()?);
        for slot in &config.slots {
            scheduler.add(
                &slot.cron,
                JobKind::Update {
                    label: slot.label.clone(),
                },
            )?;
        }
        scheduler.add(&config.reset_cron, JobKind::ResetHistory)?;
        Ok(scheduler)
    }

    pub fn add(&mut self, cron: &str, kind: JobKind) -> Result<()> {
        let schedule = CronSchedule::parse(cron)?;
        tracing::debug!("Scheduled '{}' at '{}' ({})", kind.describe(), schedule, self.tz);
        self.jobs.push(Job { schedule, kind });
        Ok(())
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Earliest instant after `after` at which any job fires, with every job
    /// due at that instant in registration order
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<&Job>)> {
        let upcoming: Vec<(DateTime<Utc>, &Job)> = self
            .jobs
            .iter()
            .filter_map(|job| job.schedule.next_after(after, self.tz).map(|at| (at, job)))
            .collect();

        let earliest = upcoming.iter().map(|(at, _)| *at).min()?;
        let due = upcoming
            .into_iter()
            .filter(|(at, _)| *at == earliest)
            .map(|(_, job)| job)
            .collect();
        Some((earliest, due))
    }

    /// Dispatch jobs until `shutdown` resolves or no job can fire again
    pub async fn run<H, F>(&self, handler: &H, shutdown: F)
    where
        H: JobHandler + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cursor = Utc::now();

        loop {
            let Some((at, due)) = self.next_fire(cursor) else {
                tracing::warn!("No scheduled job can fire again, scheduler stopping");
                return;
            };

            let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(
                "Next job '{}' at {} ({:.1}h from now)",
                due.first().map(|j| j.kind.describe()).unwrap_or_default(),
                at.with_timezone(&self.tz).format("%a %Y-%m-%d %H:%M %Z"),
                wait.as_secs_f64() / 3600.0
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Scheduler shutting down");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            for job in due {
                handler.handle(&job.kind).await;
            }

            cursor = at.max(Utc::now());
        }
    }
}
