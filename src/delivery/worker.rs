use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::sink::ChannelSink;
use crate::config::Config;
use crate::queue::{NotificationQueue, QueueError};

/// Outcome of one pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The queue file did not exist; nothing was attempted.
    pub queue_missing: bool,
    /// Entries sent and removed during this pass.
    pub delivered: usize,
    /// A send failed; the failing entry is still at the front.
    pub send_failed: bool,
    /// Entries left after the pass.
    pub remaining: usize,
}

/// Drains the queue into a channel sink on a fixed interval.
///
/// Each entry is read from the front, sent, and only then removed. A crash
/// between send and removal re-sends that entry on the next pass; an entry is
/// never removed without a successful send.
pub struct DeliveryWorker<S> {
    queue: NotificationQueue,
    sink: S,
    interval: Duration,
}

impl<S: ChannelSink> DeliveryWorker<S> {
    pub fn new(config: &Config, sink: S) -> Self {
        Self::with_queue(
            NotificationQueue::from_config(&config.queue),
            sink,
            Duration::from_secs(config.schedule.delivery_interval_secs),
        )
    }

    pub fn with_queue(queue: NotificationQueue, sink: S, interval: Duration) -> Self {
        Self {
            queue,
            sink,
            interval,
        }
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    /// One pass: send everything queued, stopping at the first failed send.
    pub async fn run_once(&self) -> Result<DeliveryReport, QueueError> {
        let mut report = DeliveryReport::default();

        info!(
            target: "fbowatch::delivery",
            path = %self.queue.path().display(),
            "Checking queue for new messages"
        );
        if !self.queue.exists() {
            warn!(
                target: "fbowatch::delivery",
                path = %self.queue.path().display(),
                "Queue file not found; will check again next interval"
            );
            report.queue_missing = true;
            return Ok(report);
        }

        while let Some(entry) = self.queue.run_blocking(|q| q.front()).await? {
            match self.sink.send(entry.title(), entry.body()).await {
                Ok(()) => {
                    info!(
                        target: "fbowatch::delivery",
                        title = %entry.title(),
                        body = %entry.body(),
                        "Message sent"
                    );
                    let sent = entry.clone();
                    if self.queue.run_blocking(move |q| q.acknowledge(&sent)).await? {
                        report.delivered += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        target: "fbowatch::delivery",
                        error = %e,
                        title = %entry.title(),
                        "Send failed; message stays queued for the next interval"
                    );
                    report.send_failed = true;
                    break;
                }
            }
        }

        report.remaining = self.queue.run_blocking(|q| q.len()).await?;
        Ok(report)
    }

    /// Run passes forever, `interval` apart, until `cancel` fires.
    ///
    /// Queue errors end the current pass only.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            target: "fbowatch::delivery",
            interval_secs = self.interval.as_secs(),
            path = %self.queue.path().display(),
            "Delivery worker started"
        );
        loop {
            match self.run_once().await {
                Ok(report) => {
                    debug!(target: "fbowatch::delivery", ?report, "Delivery pass finished")
                }
                Err(e) => error!(
                    target: "fbowatch::delivery",
                    error = %e,
                    "Delivery pass aborted; retrying next interval"
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }
        info!(target: "fbowatch::delivery", "Delivery worker stopped");
    }
}
