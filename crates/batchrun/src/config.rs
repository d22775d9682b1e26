//! Executor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout configuration for the batch executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout contribution of each task in a batch.
    ///
    /// The aggregate budget for a run is
    /// `ceil(per_task_timeout * batch_size / parallelism)`.
    pub per_task_timeout: Duration,

    /// How long to wait for cancelled tasks to drain after a forced
    /// shutdown, before declaring them stuck.
    pub grace_termination: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            per_task_timeout: Duration::from_millis(15_000),
            grace_termination: Duration::from_millis(5_000),
        }
    }
}

impl ExecutorConfig {
    /// Aggregate timeout budget for `task_count` tasks running with the
    /// given (already clamped) parallelism.
    ///
    /// The budget shrinks as parallelism grows; callers that need a hard
    /// deadline independent of parallelism must size `per_task_timeout`
    /// accordingly.
    pub(crate) fn timeout_budget(&self, task_count: usize, parallelism: usize) -> Duration {
        let per_task_ms = self.per_task_timeout.as_millis() as u64;
        let budget_ms = (per_task_ms * task_count as u64).div_ceil(parallelism as u64);
        Duration::from_millis(budget_ms)
    }
}
