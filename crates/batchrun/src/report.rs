//! Batch outcome report and timing statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ids::BatchId;

/// Aggregate outcome of one batch run.
///
/// Returned only when every task was accounted for and none failed; a
/// failed batch surfaces `BatchError::TaskFailed` instead. Not mutated
/// after return.
#[derive(Debug)]
pub struct ExecutionReport<V> {
    /// Identifier of the run that produced this report.
    pub batch_id: BatchId,

    /// Successful result values, in submission order.
    pub values: Vec<V>,

    /// Timing statistics across the batch.
    pub stats: TimingStats,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl<V> ExecutionReport<V> {
    /// Consume the report, keeping only the result values.
    pub fn into_values(self) -> Vec<V> {
        self.values
    }
}

/// Per-task timing statistics for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Number of tasks that completed successfully.
    pub completed: usize,

    /// Number of tasks submitted with the batch.
    pub submitted: usize,

    /// Sum of per-task execution times.
    pub total_elapsed: Duration,

    /// Longest single-task execution time.
    pub max_elapsed: Duration,

    /// Wall-clock duration of the whole run.
    pub wall_clock: Duration,
}

impl TimingStats {
    /// Mean per-task execution time. Zero when nothing completed.
    pub fn mean_elapsed(&self) -> Duration {
        if self.completed == 0 {
            Duration::ZERO
        } else {
            self.total_elapsed / self.completed as u32
        }
    }
}
