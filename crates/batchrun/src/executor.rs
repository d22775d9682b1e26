//! Batch executor - bounded parallel execution with timing and timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ExecutorConfig;
use crate::error::{AggregateFailure, BatchError};
use crate::ids::BatchId;
use crate::report::{ExecutionReport, TimingStats};
use crate::task::TimedTask;

/// Outcome record for one task, written by the worker that ran it and read
/// only after the batch-wide wait completes.
struct TaskOutcome<V, E> {
    index: usize,
    result: Result<V, E>,
    elapsed: Duration,
}

/// Runs batches of tasks with bounded parallelism and an aggregate timeout.
///
/// Each run gets its own short-lived pool of workers sized to
/// `min(parallelism, batch_size)`; nothing is shared between runs. The
/// caller suspends only while waiting for the batch to complete, up to the
/// timeout budget derived from [`ExecutorConfig`].
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    config: ExecutorConfig,
}

impl BatchExecutor {
    /// Create an executor with the default timeout configuration.
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create an executor with a custom timeout configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Execute every task in `batch` and report per-task results and timing.
    ///
    /// `parallelism` is a hint, clamped to `[1, batch.len()]`. A batch with
    /// a single task is executed inline on the caller, with no pool and no
    /// timeout path. Otherwise the whole batch must complete within
    /// `ceil(per_task_timeout * batch_size / parallelism)`; when that budget
    /// elapses the pool is shut down, in-flight work is cancelled at its
    /// next await point, and [`BatchError::ResourceExhausted`] is returned.
    ///
    /// Task failures never cancel other tasks. They are collected while the
    /// rest of the batch finishes and combined into a single
    /// [`BatchError::TaskFailed`], the first failure in submission order as
    /// the primary and the rest attached as secondaries.
    pub async fn run<T>(
        &self,
        activity: &str,
        mut batch: Vec<T>,
        parallelism: usize,
    ) -> Result<ExecutionReport<T::Value>, BatchError<T::Error>>
    where
        T: TimedTask + 'static,
    {
        if batch.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let batch_id = BatchId::generate();
        let started_at = Utc::now();
        let watch = Instant::now();
        let total = batch.len();
        let parallelism = parallelism.clamp(1, total);

        debug!(
            batch_id = %batch_id,
            activity = %activity,
            total,
            parallelism,
            "Submitting batch"
        );

        let outcomes = if total == 1 {
            // Single task: run inline on the caller, skipping pool setup
            // and the timeout path entirely.
            let task = batch.remove(0);
            vec![execute_timed(0, task).await]
        } else {
            self.run_pooled(&batch_id, activity, batch, parallelism)
                .await?
        };

        // Walk every task in submission order, gathering successes and
        // folding failures into a single aggregate.
        let mut values = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut sum = Duration::ZERO;
        let mut max = Duration::ZERO;
        let mut failure: Option<AggregateFailure<T::Error>> = None;

        for outcome in outcomes {
            match outcome.result {
                Ok(value) => {
                    values.push(value);
                    completed += 1;
                    sum += outcome.elapsed;
                    max = max.max(outcome.elapsed);
                }
                Err(err) => match failure.as_mut() {
                    None => failure = Some(AggregateFailure::new(err)),
                    Some(agg) => agg.push(err),
                },
            }
        }

        let stats = TimingStats {
            completed,
            submitted: total,
            total_elapsed: sum,
            max_elapsed: max,
            wall_clock: watch.elapsed(),
        };

        info!(
            batch_id = %batch_id,
            activity = %activity,
            completed,
            total,
            parallelism,
            elapsed_ms = stats.wall_clock.as_millis() as u64,
            avg_ms = stats.mean_elapsed().as_secs_f64() * 1_000.0,
            max_ms = stats.max_elapsed.as_millis() as u64,
            "Batch execution finished"
        );

        if let Some(failure) = failure {
            return Err(failure.into());
        }

        Ok(ExecutionReport {
            batch_id,
            values,
            stats,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Spawn the batch into a fresh pool and drain it within the timeout
    /// budget.
    async fn run_pooled<T>(
        &self,
        batch_id: &BatchId,
        activity: &str,
        batch: Vec<T>,
        parallelism: usize,
    ) -> Result<Vec<TaskOutcome<T::Value, T::Error>>, BatchError<T::Error>>
    where
        T: TimedTask + 'static,
    {
        let total = batch.len();
        let permits = Arc::new(Semaphore::new(parallelism));
        let mut pool: JoinSet<TaskOutcome<T::Value, T::Error>> = JoinSet::new();

        for (index, task) in batch.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            pool.spawn(async move {
                // A task cancelled while parked here never starts.
                let _permit = permits
                    .acquire_owned()
                    .await
                    .expect("executor semaphore closed");
                execute_timed(index, task).await
            });
        }

        let budget = self.config.timeout_budget(total, parallelism);
        let deadline = tokio::time::Instant::now() + budget;

        let mut slots: Vec<Option<TaskOutcome<T::Value, T::Error>>> =
            (0..total).map(|_| None).collect();
        let mut pending = total;
        while pending > 0 {
            let next = tokio::time::timeout_at(deadline, pool.join_next()).await;
            match next {
                Ok(Some(Ok(outcome))) => {
                    let index = outcome.index;
                    slots[index] = Some(outcome);
                    pending -= 1;
                }
                Ok(Some(Err(join_err))) => {
                    // The join handle resolved, so the completion count
                    // stays accurate; a panic inside a task is surfaced
                    // here rather than misreported as a batch result.
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                    pending -= 1;
                }
                Ok(None) => break,
                Err(_) => {
                    return Err(self
                        .cancel_remaining(batch_id, activity, pool, budget, total, parallelism)
                        .await);
                }
            }
        }

        // The drain loop only exits without timing out once every slot has
        // been written.
        Ok(slots.into_iter().flatten().collect())
    }

    /// Shut down the pool after a timeout: cancel everything still queued
    /// or running, give cancelled tasks a bounded window to drain, then
    /// report the exhaustion.
    async fn cancel_remaining<V, E>(
        &self,
        batch_id: &BatchId,
        activity: &str,
        mut pool: JoinSet<TaskOutcome<V, E>>,
        budget: Duration,
        task_count: usize,
        parallelism: usize,
    ) -> BatchError<E>
    where
        V: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        pool.abort_all();

        // Cancelled tasks stop at their next await point. Tasks that still
        // have not drained after the grace period are stuck on work that
        // never yields.
        let drained = tokio::time::timeout(self.config.grace_termination, async {
            while pool.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                batch_id = %batch_id,
                activity = %activity,
                grace_ms = self.config.grace_termination.as_millis() as u64,
                "Cancelled tasks did not terminate within the grace period"
            );
        }

        let err = BatchError::ResourceExhausted {
            activity: activity.to_string(),
            waited_ms: budget.as_millis() as u64,
            task_count,
            parallelism,
        };
        error!(
            batch_id = %batch_id,
            activity = %activity,
            waited_ms = budget.as_millis() as u64,
            task_count,
            parallelism,
            "Batch did not complete within the timeout budget"
        );
        err
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one task, recording its outcome and elapsed time exactly once.
///
/// A failure already of the declared kind passes through unchanged;
/// anything else goes through the task's `convert`.
async fn execute_timed<T>(index: usize, mut task: T) -> TaskOutcome<T::Value, T::Error>
where
    T: TimedTask,
{
    let start = Instant::now();
    let result = task.execute().await;
    let elapsed = start.elapsed();
    let result = result.map_err(|err| match err.downcast::<T::Error>() {
        Ok(declared) => *declared,
        Err(other) => task.convert(other),
    });
    TaskOutcome {
        index,
        result,
        elapsed,
    }
}
