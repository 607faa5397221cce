use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use wt_core::types::ProjectStructure;

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

// ---------------------------------------------------------------------------
// ChatRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectContext
// ---------------------------------------------------------------------------

/// What a conversation knows about the project it is discussing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub file_count: usize,
    pub dir_count: usize,
    pub files: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

impl ProjectContext {
    pub fn from_structure(structure: &ProjectStructure) -> Self {
        Self {
            file_count: structure.files.len(),
            dir_count: structure.directories.len(),
            files: structure.files.iter().map(|f| f.path.clone()).collect(),
            loaded_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    pub project_context: Option<ProjectContext>,
}

impl Conversation {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
            project_context: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationStore
// ---------------------------------------------------------------------------

/// Per-session conversations, bounded by least-recent use.
///
/// Every operation takes the lock for its own duration only, so two turns
/// on the same session may interleave their messages.
pub struct ConversationStore {
    sessions: Mutex<LruCache<String, Conversation>>,
}

impl ConversationStore {
    /// A zero capacity is treated as one.
    pub fn new(max_sessions: usize) -> Self {
        let cap = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Create, or reset, an empty conversation.
    pub async fn start(&self, session_id: &str) -> Conversation {
        let conversation = Conversation::new(session_id);
        let mut sessions = self.sessions.lock().await;
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), conversation.clone()) {
            if evicted != session_id {
                debug!(session_id = %evicted, "conversation evicted");
            }
        }
        debug!(session_id, "conversation started");
        conversation
    }

    /// Create the conversation if missing. Returns whether it was created.
    pub async fn ensure(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(session_id).is_some() {
            return false;
        }
        if let Some((evicted, _)) =
            sessions.push(session_id.to_string(), Conversation::new(session_id))
        {
            debug!(session_id = %evicted, "conversation evicted");
        }
        true
    }

    /// Append a message, creating the conversation when needed.
    pub async fn append(
        &self,
        session_id: &str,
        role: ChatRole,
        content: impl Into<String>,
    ) -> ChatMessage {
        let message = ChatMessage::new(role, content);
        let mut sessions = self.sessions.lock().await;
        if let Some(conversation) = sessions.get_mut(session_id) {
            conversation.messages.push(message.clone());
            return message;
        }

        let mut conversation = Conversation::new(session_id);
        conversation.messages.push(message.clone());
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), conversation) {
            debug!(session_id = %evicted, "conversation evicted");
        }
        message
    }

    /// All messages, oldest first. Empty for unknown sessions.
    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// The last `n` messages, oldest first.
    pub async fn recent(&self, session_id: &str, n: usize) -> Vec<ChatMessage> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(c) => {
                let skip = c.messages.len().saturating_sub(n);
                c.messages[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub async fn project_context(&self, session_id: &str) -> Option<ProjectContext> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .and_then(|c| c.project_context.clone())
    }

    /// Attach a context to a conversation that has none yet.
    ///
    /// Returns `false` when the session is unknown or already has one; an
    /// existing context is never refreshed.
    pub async fn set_project_context(&self, session_id: &str, context: ProjectContext) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(session_id) {
            Some(c) if c.project_context.is_none() => {
                c.project_context = Some(context);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Conversation> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Remove a conversation. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.pop(session_id).is_some();
        if removed {
            debug!(session_id, "conversation cleared");
        }
        removed
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}
