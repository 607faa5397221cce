use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RemoteEntry;

/// Errors raised by remote collaborators (source hosting, issue tracker).
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Connection, DNS, TLS or unexpected HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// The token is missing, expired or lacks the required scope.
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The response arrived but its body could not be interpreted.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only access to a hosted repository.
#[async_trait]
pub trait RemoteReader: Send + Sync {
    /// List the entries directly under `path` (`""` is the repository root).
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Fetch the text content of a single file.
    async fn read_file(&self, path: &str) -> Result<String, RemoteError>;
}

/// Confirmation returned after an issue was filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReceipt {
    pub number: u64,
    pub url: String,
}

/// Files issues on the project's tracker.
#[async_trait]
pub trait IssueReporter: Send + Sync {
    async fn file_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueReceipt, RemoteError>;
}
