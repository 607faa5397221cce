//! LLM access and conversational state.
//!
//! - [`llm`]: provider trait, Anthropic Messages API client and a mock.
//! - [`responder`]: the never-failing AI responder used by scans and chat.
//! - [`conversation`]: bounded per-session conversation store.

pub mod conversation;
pub mod llm;
pub mod responder;

pub use conversation::{ChatMessage, ChatRole, Conversation, ConversationStore, ProjectContext};
pub use llm::{
    AnthropicProvider, LlmConfig, LlmError, LlmMessage, LlmProvider, LlmResponse, LlmRole,
    MockProvider,
};
pub use responder::{AiResponder, LlmResponder};
