//! Bounded, newest-first record of completed jobs.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::HISTORY_LIMIT;
use crate::effects::Effect;
use crate::job::{JobId, JobStatus, ProcessingJob};

/// Compact snapshot of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: JobId,
    #[serde(rename = "type")]
    pub effect: Effect,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
}

impl From<&ProcessingJob> for HistoryRecord {
    fn from(job: &ProcessingJob) -> Self {
        Self {
            id: job.id,
            effect: job.effect,
            status: job.status,
            progress: job.progress,
            result: job.result.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobHistory {
    records: VecDeque<HistoryRecord>,
    limit: usize,
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl JobHistory {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit + 1),
            limit,
        }
    }

    /// Prepend a record, dropping the oldest beyond the limit.
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push_front(record);
        self.records.truncate(self.limit);
    }

    /// Records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
