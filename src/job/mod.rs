pub mod runner;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{INITIAL_PROGRESS, PROGRESS_CEILING};
use crate::effects::Effect;

/// Session-unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a prompt before the job can be queued.
    Idle,
    Queued,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Idle => "idle",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// One request to apply an effect and wait for the CDN to render it.
///
/// Transitions only move forward (`idle → queued → processing → completed |
/// error`); every mutator is a no-op once the job is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: JobId,
    #[serde(rename = "type")]
    pub effect: Effect,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl ProcessingJob {
    fn with_status(id: JobId, effect: Effect, status: JobStatus) -> Self {
        Self {
            id,
            effect,
            status,
            progress: 0,
            result: None,
            error: None,
        }
    }

    /// A placeholder job for an effect still waiting for its prompt.
    pub fn idle(id: JobId, effect: Effect) -> Self {
        Self::with_status(id, effect, JobStatus::Idle)
    }

    pub fn queued(id: JobId, effect: Effect) -> Self {
        Self::with_status(id, effect, JobStatus::Queued)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.status, JobStatus::Queued | JobStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Error)
    }

    pub fn start_processing(&mut self) {
        if matches!(self.status, JobStatus::Idle | JobStatus::Queued) {
            self.status = JobStatus::Processing;
            self.progress = self.progress.max(INITIAL_PROGRESS);
        }
    }

    /// Raise progress. Lower values are ignored so progress never goes back.
    pub fn advance(&mut self, progress: u8) {
        if self.status == JobStatus::Processing {
            self.progress = self.progress.max(progress.min(PROGRESS_CEILING));
        }
    }

    pub fn complete(&mut self, result: String) {
        if !self.is_terminal() {
            self.status = JobStatus::Completed;
            self.progress = 100;
            self.result = Some(result);
        }
    }

    pub fn fail(&mut self, message: String) {
        if !self.is_terminal() {
            self.status = JobStatus::Error;
            self.error = Some(message);
        }
    }
}

/// Progress shown after `attempts` unsuccessful checks:
/// `min(10 + attempts * 1.5, 90)`, rounded down.
pub fn progress_after(attempts: u32) -> u8 {
    let raw = INITIAL_PROGRESS as u32 + attempts.saturating_mul(3) / 2;
    raw.min(PROGRESS_CEILING as u32) as u8
}
