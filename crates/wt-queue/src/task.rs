use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Future produced by one invocation of a task's action.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Zero-argument async action. It is invoked once per attempt, so it must be
/// callable repeatedly.
pub type TaskAction = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task id is required")]
    MissingId,
    #[error("task name is required")]
    MissingName,
    #[error("task {0} has no action")]
    MissingAction(String),
    #[error("task {0} must allow at least one attempt")]
    ZeroRetries(String),
    #[error("task {0} is already queued")]
    DuplicateId(String),
}

// ---------------------------------------------------------------------------
// TaskSpec
// ---------------------------------------------------------------------------

/// Caller-side description of a task. Unset fields take the queue defaults.
#[derive(Clone, Default)]
pub struct TaskSpec {
    pub id: String,
    pub name: String,
    pub action: Option<TaskAction>,
    pub priority: Option<i32>,
    pub max_retries: Option<u32>,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_action", &self.action.is_some())
            .field("priority", &self.priority)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach the async closure to run on each attempt.
    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Presence checks that do not depend on queue state.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.action.is_none() {
            return Err(ValidationError::MissingAction(self.id.clone()));
        }
        if self.max_retries == Some(0) {
            return Err(ValidationError::ZeroRetries(self.id.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A queued or finished unit of work.
///
/// `attempts` never exceeds `max_retries`. Once the status is terminal the
/// task lives in the queue history and is only handed out as a copy.
#[derive(Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub max_retries: u32,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) action: TaskAction,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .field("max_retries", &self.max_retries)
            .field("error", &self.error)
            .finish()
    }
}

impl Task {
    pub(crate) fn new(
        id: String,
        name: String,
        action: TaskAction,
        priority: i32,
        max_retries: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            max_retries,
            timeout,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            action,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self, result: Value) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn run_action(&self) -> TaskFuture {
        (self.action)()
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
