//! Short-lived memoisation of the remote project listing.
//!
//! Reading the repository structure is an API round trip per call; scans and
//! chat turns both need it, so a single snapshot is kept for a fixed TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::remote::{RemoteError, RemoteReader};
use crate::types::ProjectStructure;

/// Default time-to-live for a cached snapshot.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedStructure {
    snapshot: Arc<ProjectStructure>,
    expires_at: Instant,
}

/// Single-slot cache in front of [`RemoteReader::list`].
pub struct ReportCache {
    reader: Arc<dyn RemoteReader>,
    root: String,
    ttl: Duration,
    slot: Mutex<Option<CachedStructure>>,
}

impl ReportCache {
    /// Cache the repository root with the default TTL.
    pub fn new(reader: Arc<dyn RemoteReader>) -> Self {
        Self {
            reader,
            root: String::new(),
            ttl: DEFAULT_TTL,
            slot: Mutex::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// List `root` instead of the repository root.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot while fresh, otherwise refetch it.
    ///
    /// The slot stays locked across the refetch so concurrent misses
    /// produce one remote call. Reader errors are returned unchanged and
    /// leave any stale snapshot in place.
    pub async fn get(&self) -> Result<Arc<ProjectStructure>, RemoteError> {
        let mut slot = self.slot.lock().await;
        let now = Instant::now();

        if let Some(cached) = slot.as_ref() {
            if now < cached.expires_at {
                debug!(root = %self.root, "project structure cache hit");
                return Ok(Arc::clone(&cached.snapshot));
            }
        }

        debug!(root = %self.root, "project structure cache miss, fetching");
        let entries = self.reader.list(&self.root).await?;
        let snapshot = Arc::new(ProjectStructure::from_entries(entries, Utc::now()));

        *slot = Some(CachedStructure {
            snapshot: Arc::clone(&snapshot),
            expires_at: Instant::now() + self.ttl,
        });

        debug!(
            files = snapshot.files.len(),
            directories = snapshot.directories.len(),
            "project structure cached"
        );
        Ok(snapshot)
    }
}
