//! Caller-supplied units of work.

use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::io;

/// Generic failure escaping a unit of work before translation.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A unit of work executed and timed by the batch executor.
///
/// Implementors declare the failure kind callers observe through
/// [`TimedTask::Error`]. A failure raised by [`TimedTask::execute`] that is
/// already of that kind passes through unchanged; anything else is handed
/// to [`TimedTask::convert`], so the failure vocabulary stays uniform no
/// matter what the inner work actually raised.
#[async_trait]
pub trait TimedTask: Send {
    /// Result value produced on success.
    type Value: Send + 'static;

    /// Declared failure kind observed by callers.
    type Error: Error + Send + 'static;

    /// Perform the work.
    ///
    /// Runs on a pool worker, or inline on the caller for single-task
    /// batches. Cancellation is cooperative: when a run times out, the
    /// future is dropped at its next await point. Work that never yields
    /// cannot be stopped.
    async fn execute(&mut self) -> Result<Self::Value, BoxError>;

    /// Translate a failure that is not already of the declared kind.
    fn convert(&self, error: BoxError) -> Self::Error;
}

/// Adapter turning an async closure into a [`TimedTask`].
///
/// `work` produces the result; `translate` maps foreign failures into the
/// declared kind.
pub struct FnTask<F, C> {
    work: F,
    translate: C,
}

impl<F, C> FnTask<F, C> {
    /// Create a task from an async closure and a failure translation.
    pub fn new(work: F, translate: C) -> Self {
        Self { work, translate }
    }
}

#[async_trait]
impl<F, Fut, V, C, E> TimedTask for FnTask<F, C>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
    V: Send + 'static,
    C: Fn(BoxError) -> E + Send + Sync,
    E: Error + Send + 'static,
{
    type Value = V;
    type Error = E;

    async fn execute(&mut self) -> Result<V, BoxError> {
        (self.work)().await
    }

    fn convert(&self, error: BoxError) -> E {
        (self.translate)(error)
    }
}

/// Convenience constructor for tasks that declare [`io::Error`] as their
/// failure kind.
pub fn io_task<F, Fut, V>(work: F) -> FnTask<F, impl Fn(BoxError) -> io::Error + Send + Sync>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
    V: Send + 'static,
{
    FnTask::new(work, |error: BoxError| io::Error::other(error))
}
