//! Priority task queue with bounded retries, per-attempt timeouts and an
//! execution history.
//!
//! Tasks run one at a time in descending priority order. Each attempt races
//! the task's action against its timeout; failures are retried with a
//! linear backoff and, once retries are exhausted, recorded as a failed
//! task rather than surfaced as an error.

pub mod queue;
pub mod task;

pub use queue::{QueueConfig, QueueError, QueueStats, TaskQueue};
pub use task::{Task, TaskAction, TaskSpec, TaskStatus, ValidationError};
