//! Batch execution errors.

use std::fmt;
use thiserror::Error;

/// Errors surfaced by a batch run.
#[derive(Debug, Error)]
pub enum BatchError<E>
where
    E: std::error::Error + 'static,
{
    /// An empty batch was submitted.
    #[error("At least one task must be submitted")]
    EmptyBatch,

    /// The aggregate timeout elapsed before every task completed.
    ///
    /// The batch was forcibly shut down and its per-task results are no
    /// longer trustworthy, so this supersedes any individual task failures.
    #[error(
        "Waited {waited_ms}ms, but tasks for '{activity}' are not complete. \
         Total task count {task_count}, parallelism {parallelism}"
    )]
    ResourceExhausted {
        /// Activity name the batch was submitted under.
        activity: String,
        /// The timeout budget that elapsed, in milliseconds.
        waited_ms: u64,
        /// Number of tasks in the batch.
        task_count: usize,
        /// Clamped parallelism the batch ran with.
        parallelism: usize,
    },

    /// One or more tasks failed.
    #[error(transparent)]
    TaskFailed(#[from] AggregateFailure<E>),
}

/// A primary task failure with every later failure attached as a secondary
/// cause.
///
/// The primary is the first failure in submission order; the rest are kept
/// in submission order as well, so no failure is ever dropped silently.
#[derive(Debug)]
pub struct AggregateFailure<E> {
    primary: E,
    secondary: Vec<E>,
}

impl<E> AggregateFailure<E> {
    pub(crate) fn new(primary: E) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, failure: E) {
        self.secondary.push(failure);
    }

    /// The first failure encountered in submission order.
    pub fn primary(&self) -> &E {
        &self.primary
    }

    /// Later failures, in submission order.
    pub fn secondary(&self) -> &[E] {
        &self.secondary
    }

    /// Total number of underlying failures.
    pub fn count(&self) -> usize {
        1 + self.secondary.len()
    }

    /// Decompose into the primary failure and the secondary ones.
    pub fn into_parts(self) -> (E, Vec<E>) {
        (self.primary, self.secondary)
    }
}

impl<E: fmt::Display> fmt::Display for AggregateFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        if !self.secondary.is_empty() {
            write!(
                f,
                " ({} further task failures suppressed)",
                self.secondary.len()
            )?;
        }
        Ok(())
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AggregateFailure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}
