//! Poll-until-terminal state machine for one job.
//!
//! One read happens immediately, then one per interval. Reads never overlap:
//! the next tick is only awaited after the previous read resolved, and ticks
//! missed while a slow read was outstanding are skipped. Cancellation and
//! the deadline are checked ahead of every tick and race every read, so no
//! read starts after either fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{JobStatus, JobStatusResponse};

use super::{JobStatusSource, PollError};

/// Cadence and wall-clock budget of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// How a poll ended, short of a read error.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(JobStatusResponse),
    Failed(JobStatusResponse),
    /// The budget ran out. The job itself is untouched.
    TimedOut { last_seen: Option<JobStatusResponse> },
    Cancelled,
}

/// Repeatedly reads a job's status until it is terminal.
#[derive(Clone)]
pub struct StatusPoller {
    source: Arc<dyn JobStatusSource>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn JobStatusSource>, config: PollerConfig) -> Self {
        Self { source, config }
    }

    /// Poll until a stopping condition: terminal status, read error,
    /// timeout, or `cancel` firing.
    pub async fn poll(
        &self,
        job_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<PollOutcome, PollError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_seen: Option<JobStatusResponse> = None;
        let mut reads: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(job_id, reads)),
                _ = sleep_until(deadline) => return Ok(self.timed_out(job_id, reads, last_seen)),
                _ = ticker.tick() => {}
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(job_id, reads)),
                _ = sleep_until(deadline) => return Ok(self.timed_out(job_id, reads, last_seen)),
                read = self.source.fetch(job_id) => match read {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(job_id = %job_id, reads = reads + 1, error = %e, "Status read failed; polling stopped");
                        return Err(e);
                    }
                },
            };
            reads += 1;

            debug!(job_id = %job_id, reads, status = %status.status, "Status read");

            match status.status {
                JobStatus::Completed => {
                    info!(job_id = %job_id, reads, "Job completed");
                    return Ok(PollOutcome::Completed(status));
                }
                JobStatus::Failed => {
                    info!(job_id = %job_id, reads, "Job failed");
                    return Ok(PollOutcome::Failed(status));
                }
                JobStatus::Running => last_seen = Some(status),
            }
        }
    }

    /// Poll on a background task. Dropping the handle cancels the poll.
    pub fn spawn(&self, job_id: Uuid) -> PollHandle {
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { poller.poll(job_id, token).await });

        PollHandle {
            cancel: cancel.clone(),
            guard: cancel.drop_guard(),
            task,
        }
    }

    fn cancelled(&self, job_id: Uuid, reads: u32) -> PollOutcome {
        info!(job_id = %job_id, reads, "Polling cancelled");
        PollOutcome::Cancelled
    }

    fn timed_out(
        &self,
        job_id: Uuid,
        reads: u32,
        last_seen: Option<JobStatusResponse>,
    ) -> PollOutcome {
        warn!(
            job_id = %job_id,
            reads,
            timeout_secs = self.config.timeout.as_secs(),
            "Job did not finish in time"
        );
        PollOutcome::TimedOut { last_seen }
    }
}

/// A poll running in the background.
pub struct PollHandle {
    cancel: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<Result<PollOutcome, PollError>>,
}

impl PollHandle {
    /// Stop the poll. No read starts after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poll to finish.
    pub async fn outcome(self) -> Result<PollOutcome, PollError> {
        let PollHandle { guard, task, .. } = self;
        let joined = task.await;
        drop(guard);
        joined.map_err(|e| PollError::Aborted(e.to_string()))?
    }
}
