//! Polls a combined locator until the CDN has rendered it.
//!
//! A run never touches session state. It reports [`JobUpdate`]s over a
//! channel and the session applies them, so there is exactly one writer.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{JobId, progress_after};
use crate::consts::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use crate::probe::Probe;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// What a run reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    /// A check missed; progress moved.
    Processing { job: JobId, progress: u8 },
    /// The check succeeded.
    Ready { job: JobId, result: String },
    /// Attempts ran out. The locator is assumed valid anyway.
    TimedOut { job: JobId, result: String },
    /// The run could not be started.
    Failed { job: JobId, message: String },
}

impl JobUpdate {
    pub fn job(&self) -> JobId {
        match self {
            JobUpdate::Processing { job, .. }
            | JobUpdate::Ready { job, .. }
            | JobUpdate::TimedOut { job, .. }
            | JobUpdate::Failed { job, .. } => *job,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobUpdate::Processing { .. })
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Ready,
    TimedOut,
    Failed,
    Cancelled,
}

/// Executes poll chains against a [`Probe`]. Cheap to clone.
#[derive(Clone)]
pub struct JobRunner {
    probe: Arc<dyn Probe>,
    config: RunnerConfig,
}

impl JobRunner {
    pub fn new(probe: Arc<dyn Probe>, config: RunnerConfig) -> Self {
        Self { probe, config }
    }

    /// Start a run on the tokio runtime and hand back its handle.
    pub fn spawn(
        &self,
        job: JobId,
        locator: String,
        updates: mpsc::UnboundedSender<JobUpdate>,
    ) -> RunHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let runner = self.clone();
        let handle =
            tokio::spawn(async move { runner.run(job, &locator, &updates, cancel_rx).await });
        RunHandle {
            job,
            cancel: cancel_tx,
            handle,
        }
    }

    /// Poll `locator` until it is ready, attempts run out, or the run is
    /// cancelled. Exactly one terminal update is sent unless cancelled.
    pub async fn run(
        &self,
        job: JobId,
        locator: &str,
        updates: &mpsc::UnboundedSender<JobUpdate>,
        mut cancel: watch::Receiver<bool>,
    ) -> RunOutcome {
        if let Err(message) = validate_locator(locator) {
            warn!(%job, locator, "job failed to start: {message}");
            let _ = updates.send(JobUpdate::Failed { job, message });
            return RunOutcome::Failed;
        }

        info!(%job, locator, "polling for transformed image");
        let mut attempts = 0;
        loop {
            if *cancel.borrow() {
                debug!(%job, "run cancelled");
                return RunOutcome::Cancelled;
            }

            attempts += 1;
            match self.probe.check(locator).await {
                Ok(true) => {
                    info!(%job, attempts, "transformed image is ready");
                    let _ = updates.send(JobUpdate::Ready {
                        job,
                        result: locator.to_string(),
                    });
                    return RunOutcome::Ready;
                }
                Ok(false) => debug!(%job, attempts, "not ready yet"),
                Err(e) => debug!(%job, attempts, "check failed, treating as not ready: {e:#}"),
            }

            let _ = updates.send(JobUpdate::Processing {
                job,
                progress: progress_after(attempts),
            });

            if attempts >= self.config.max_attempts {
                // Fail-open: the CDN may still be rendering, or the transform
                // may be broken. We cannot tell, so the locator is used as-is.
                warn!(
                    %job,
                    attempts,
                    "no confirmation after {} checks, assuming the image is ready",
                    attempts
                );
                let _ = updates.send(JobUpdate::TimedOut {
                    job,
                    result: locator.to_string(),
                });
                return RunOutcome::TimedOut;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = cancel.changed() => {
                    debug!(%job, "run cancelled while waiting");
                    return RunOutcome::Cancelled;
                }
            }
        }
    }
}

/// Handle to a spawned run. Dropping it cancels the run.
pub struct RunHandle {
    job: JobId,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn job(&self) -> JobId {
        self.job
    }

    /// Ask the run to stop at its next suspension point.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the run to end.
    pub async fn join(self) -> RunOutcome {
        let RunHandle { cancel, handle, .. } = self;
        let outcome = handle.await.unwrap_or(RunOutcome::Failed);
        drop(cancel);
        outcome
    }
}

/// Only absolute http(s) locators can be checked.
fn validate_locator(locator: &str) -> Result<(), String> {
    let url = Url::parse(locator).map_err(|e| format!("invalid image locator {locator}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported locator scheme: {other}")),
    }
}
