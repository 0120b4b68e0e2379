use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{Job, Schedule};
use crate::config::Config;
use crate::feed::{FeedError, FeedSource};
use crate::notification::NotificationEvent;
use crate::queue::{NotificationQueue, QueueError};
use crate::report::MonthlyReport;
use crate::rules::RuleEvaluator;

pub const DIAGNOSTIC_TITLE: &str = "FSE FBO Check Failed";

/// Why a check cycle aborted. Never escapes the scheduler loop.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Runs scheduled jobs for the checker process.
///
/// Everything a job produces goes through the queue, diagnostics included;
/// this process never talks to the channel directly.
pub struct CheckRunner<F> {
    feed: F,
    evaluator: RuleEvaluator,
    queue: NotificationQueue,
    schedule: Schedule,
    report: Option<MonthlyReport>,
}

impl<F: FeedSource> CheckRunner<F> {
    pub fn new(config: &Config, feed: F) -> Result<Self> {
        Ok(Self {
            feed,
            evaluator: RuleEvaluator::new(&config.thresholds),
            queue: NotificationQueue::from_config(&config.queue),
            schedule: Schedule::from_config(config)?,
            report: MonthlyReport::from_config(config)?,
        })
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    /// One FBO check: fetch, evaluate, queue. Returns how many events were queued.
    ///
    /// A feed failure queues a single diagnostic event and aborts the cycle.
    pub async fn run_check(&self) -> Result<usize, CheckError> {
        info!(target: "fbowatch::scheduler", feed = %self.feed.name(), "Running FBO check");
        let snapshot = match self.feed.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.queue_diagnostic(&e).await;
                return Err(e.into());
            }
        };

        let events = self.evaluator.evaluate(&snapshot);
        let count = events.len();
        self.queue.run_blocking(move |q| q.append_all(events)).await?;
        info!(
            target: "fbowatch::scheduler",
            rows = snapshot.len(),
            queued = count,
            "FBO check complete"
        );
        Ok(count)
    }

    /// Monthly maintenance report for the month before `today`.
    pub async fn run_monthly_report(&self, today: NaiveDate) -> Result<usize, CheckError> {
        let Some(report) = &self.report else {
            return Ok(0);
        };
        let events = match report.build(today).await {
            Ok(events) => events,
            Err(e) => {
                self.queue_diagnostic(&e).await;
                return Err(e.into());
            }
        };
        let count = events.len();
        self.queue.run_blocking(move |q| q.append_all(events)).await?;
        info!(target: "fbowatch::scheduler", queued = count, "Monthly report complete");
        Ok(count)
    }

    /// Run one job, logging (not returning) any failure.
    pub async fn run_job(&self, job: Job, now: DateTime<Utc>) {
        let result = match job {
            Job::FboCheck => self.run_check().await.map(drop),
            Job::MonthlyReport => self.run_monthly_report(now.date_naive()).await.map(drop),
            Job::Heartbeat => {
                info!(target: "fbowatch::scheduler", at = %now, "fbowatch still running");
                Ok(())
            }
        };
        if let Err(e) = result {
            error!(
                target: "fbowatch::scheduler",
                ?job,
                error = %e,
                "Job failed; will run again at its next slot"
            );
        }
    }

    /// Sleep until each scheduled slot and run its jobs, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(target: "fbowatch::scheduler", schedule = ?self.schedule, "Scheduler started");
        let mut cursor = Utc::now();
        loop {
            let Some((when, jobs)) = self.schedule.next_after(cursor) else {
                warn!(target: "fbowatch::scheduler", "Nothing scheduled; idling until shutdown");
                cancel.cancelled().await;
                break;
            };
            let wait = (when - Utc::now()).to_std().unwrap_or_default();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {}
            }
            for job in jobs {
                self.run_job(job, when).await;
            }
            // Slots that passed while jobs were running are skipped, not replayed.
            cursor = when.max(Utc::now());
        }
        info!(target: "fbowatch::scheduler", "Scheduler stopped");
    }

    /// Best-effort: a failure here is logged and otherwise ignored.
    async fn queue_diagnostic(&self, cause: &FeedError) {
        let event = NotificationEvent::new(DIAGNOSTIC_TITLE, cause.to_string());
        warn!(target: "fbowatch::scheduler", error = %cause, "Check aborted; queuing diagnostic");
        if let Err(e) = self.queue.run_blocking(move |q| q.append(event)).await {
            error!(
                target: "fbowatch::scheduler",
                error = %e,
                "Could not queue diagnostic notification"
            );
        }
    }
}
