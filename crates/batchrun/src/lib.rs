//! Bounded, timed batch execution.
//!
//! Runs a batch of independent async tasks across a limited worker pool,
//! measures per-task execution time, and enforces an aggregate timeout
//! proportional to batch size and parallelism. When the timeout elapses,
//! outstanding work is cancelled. Per-task failures are collected and
//! surfaced as a single combined failure after the whole batch has been
//! accounted for.
//!
//! This crate emits `tracing` events but never installs a subscriber;
//! that is the embedding application's job.

pub mod config;
pub mod error;
pub mod executor;
pub mod ids;
pub mod report;
pub mod task;

// Re-export commonly used types
pub use config::ExecutorConfig;
pub use error::{AggregateFailure, BatchError};
pub use executor::BatchExecutor;
pub use ids::BatchId;
pub use report::{ExecutionReport, TimingStats};
pub use task::{io_task, BoxError, FnTask, TimedTask};
