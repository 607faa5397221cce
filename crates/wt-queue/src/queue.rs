use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wt_core::config::TaskDefaultsConfig;

use crate::task::{Task, TaskSpec, TaskStatus, ValidationError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub default_priority: i32,
    pub default_max_retries: u32,
    pub default_timeout: Duration,
    /// Attempt `n` is followed by a `n * retry_backoff` pause.
    pub retry_backoff: Duration,
    /// Oldest history entries are dropped beyond this many.
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from(&TaskDefaultsConfig::default())
    }
}

impl From<&TaskDefaultsConfig> for QueueConfig {
    fn from(cfg: &TaskDefaultsConfig) -> Self {
        Self {
            default_priority: cfg.default_priority,
            default_max_retries: cfg.max_retries.max(1),
            default_timeout: Duration::from_millis(cfg.timeout_ms),
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
            history_limit: cfg.history_limit.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Percentage of completed tasks, `0.0` for an empty history.
    pub success_rate: f64,
}

// ---------------------------------------------------------------------------
// TaskQueue
// ---------------------------------------------------------------------------

/// Sequential priority queue.
///
/// `run_all` drains the pending list and drives each task to a terminal
/// state before starting the next. Only one `run_all` may be in flight;
/// overlapping calls return immediately with nothing.
pub struct TaskQueue {
    config: QueueConfig,
    pending: Mutex<Vec<Task>>,
    history: Mutex<VecDeque<Task>>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, including on cancellation.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(Vec::new()),
            history: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Validate a spec and fill in the queue defaults without queueing it.
    ///
    /// The returned task can be handed straight to [`execute_one`](Self::execute_one).
    pub fn prepare(&self, spec: TaskSpec) -> Result<Task, QueueError> {
        spec.validate()?;
        let action = spec
            .action
            .ok_or_else(|| ValidationError::MissingAction(spec.id.clone()))?;
        Ok(Task::new(
            spec.id,
            spec.name,
            action,
            spec.priority.unwrap_or(self.config.default_priority),
            spec.max_retries.unwrap_or(self.config.default_max_retries),
            spec.timeout.unwrap_or(self.config.default_timeout),
        ))
    }

    /// Validate a spec, fill in defaults and queue it by priority.
    ///
    /// Equal priorities keep submission order. Returns a copy of the
    /// queued task.
    pub async fn submit(&self, spec: TaskSpec) -> Result<Task, QueueError> {
        let mut pending = self.pending.lock().await;
        if pending.iter().any(|t| t.id == spec.id) {
            return Err(ValidationError::DuplicateId(spec.id).into());
        }

        let task = self.prepare(spec)?;

        info!(
            task_id = %task.id,
            name = %task.name,
            priority = task.priority,
            max_retries = task.max_retries,
            "task queued"
        );

        pending.push(task.clone());
        // `sort_by` is stable, so equal priorities stay in insertion order.
        pending.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(task)
    }

    /// Execute every pending task in priority order.
    ///
    /// Returns the finished tasks in execution order, or an empty vec when
    /// another run is already in progress.
    pub async fn run_all(&self) -> Vec<Task> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("task queue already running, skipping run_all");
            return Vec::new();
        }
        let _guard = RunGuard(&self.running);

        let batch = std::mem::take(&mut *self.pending.lock().await);
        info!(count = batch.len(), "task queue run starting");

        let mut results = Vec::with_capacity(batch.len());
        for task in batch {
            results.push(self.execute_one(task).await);
        }

        let completed = results
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        info!(
            total = results.len(),
            completed,
            failed = results.len() - completed,
            "task queue run finished"
        );
        results
    }

    /// Drive one task to a terminal state and record it in history.
    ///
    /// Each attempt races the action against the task timeout; a losing
    /// action future is dropped. This never fails: exhaustion of retries is
    /// reported through the returned task's status and error.
    pub async fn execute_one(&self, mut task: Task) -> Task {
        task.start();
        let mut last_error = String::new();

        for attempt in 1..=task.max_retries {
            task.attempts = attempt;
            debug!(task_id = %task.id, attempt, "task attempt starting");

            match tokio::time::timeout(task.timeout, task.run_action()).await {
                Ok(Ok(value)) => {
                    task.complete(value);
                    info!(task_id = %task.id, attempt, "task completed");
                    self.record(task.clone()).await;
                    return task;
                }
                Ok(Err(e)) => {
                    last_error = format!("{e:#}");
                }
                Err(_) => {
                    last_error = format!("task timed out after {}ms", task.timeout.as_millis());
                }
            }

            task.error = Some(last_error.clone());
            warn!(
                task_id = %task.id,
                attempt,
                max_retries = task.max_retries,
                error = %last_error,
                "task attempt failed"
            );

            if attempt < task.max_retries {
                tokio::time::sleep(self.config.retry_backoff * attempt).await;
            }
        }

        task.fail(last_error);
        warn!(task_id = %task.id, attempts = task.attempts, "task failed after retries");
        self.record(task.clone()).await;
        task
    }

    async fn record(&self, task: Task) {
        let mut history = self.history.lock().await;
        history.push_back(task);
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pending tasks in the order they would run.
    pub async fn pending(&self) -> Vec<Task> {
        self.pending.lock().await.clone()
    }

    /// Drop all pending tasks and the history.
    pub async fn clear(&self) {
        self.pending.lock().await.clear();
        self.history.lock().await.clear();
        debug!("task queue cleared");
    }

    /// Terminal tasks in completion order.
    pub async fn history(&self) -> Vec<Task> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn stats(&self) -> QueueStats {
        let history = self.history.lock().await;
        let total = history.len();
        let completed = history
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let failed = history
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count();
        let success_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        QueueStats {
            total,
            completed,
            failed,
            success_rate,
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
