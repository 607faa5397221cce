use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;
use wt_core::types::CodeAnalysis;

use crate::llm::{LlmConfig, LlmMessage, LlmProvider};

const SYSTEM_PROMPT: &str = "You are a senior software engineer helping maintain a project. \
    Be concise, concrete and actionable.";

/// Turns beyond this many are dropped from the running `chat` history.
const MAX_CHAT_TURNS: usize = 40;

/// Text generation used by the scanner and the chat front-end.
///
/// Implementations never fail: when the backing model is unavailable they
/// answer with a degraded placeholder instead.
#[async_trait]
pub trait AiResponder: Send + Sync {
    /// One-shot completion of `prompt`.
    async fn generate(&self, prompt: &str) -> String;

    /// Continue this responder's own running conversation.
    async fn chat(&self, message: &str) -> String;

    /// Review `code` written in `language`.
    async fn analyze_code(&self, code: &str, language: &str) -> CodeAnalysis;
}

/// [`AiResponder`] backed by an [`LlmProvider`].
pub struct LlmResponder {
    provider: Arc<dyn LlmProvider>,
    config: LlmConfig,
    history: Mutex<Vec<LlmMessage>>,
}

impl LlmResponder {
    pub fn new(provider: Arc<dyn LlmProvider>, config: LlmConfig) -> Self {
        Self {
            provider,
            config,
            history: Mutex::new(Vec::new()),
        }
    }

    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, String> {
        let mut request = Vec::with_capacity(messages.len() + 1);
        request.push(LlmMessage::system(SYSTEM_PROMPT));
        request.extend_from_slice(messages);
        self.provider
            .complete(&request, &self.config)
            .await
            .map(|r| r.content)
            .map_err(|e| e.to_string())
    }

    fn analysis_prompt(code: &str, language: &str) -> String {
        format!(
            "Review the following {language} code. Reply with a JSON object only, using the keys \
             \"summary\" (string), \"issues\" (array of strings) and \"suggestions\" (array of \
             strings).\n\n```{language}\n{code}\n```"
        )
    }
}

#[async_trait]
impl AiResponder for LlmResponder {
    async fn generate(&self, prompt: &str) -> String {
        match self.complete(&[LlmMessage::user(prompt)]).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generate failed, returning placeholder");
                format!("AI response unavailable right now ({e}).")
            }
        }
    }

    async fn chat(&self, message: &str) -> String {
        let mut history = self.history.lock().await;
        history.push(LlmMessage::user(message));

        match self.complete(&history).await {
            Ok(text) => {
                history.push(LlmMessage::assistant(text.clone()));
                let excess = history.len().saturating_sub(MAX_CHAT_TURNS);
                history.drain(..excess);
                text
            }
            Err(e) => {
                // Keep the history alternating user/assistant.
                history.pop();
                warn!(error = %e, "chat failed, returning placeholder");
                format!("AI chat unavailable right now ({e}).")
            }
        }
    }

    async fn analyze_code(&self, code: &str, language: &str) -> CodeAnalysis {
        let prompt = Self::analysis_prompt(code, language);
        match self.complete(&[LlmMessage::user(prompt)]).await {
            Ok(text) => parse_analysis(&text),
            Err(e) => {
                warn!(error = %e, language, "code analysis failed, returning placeholder");
                CodeAnalysis::Raw(format!("Code analysis unavailable ({e})."))
            }
        }
    }
}

/// Parse a model reply as JSON, tolerating a surrounding markdown fence.
pub fn parse_analysis(text: &str) -> CodeAnalysis {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match serde_json::from_str::<serde_json::Value>(unfenced) {
        Ok(value) if value.is_object() => CodeAnalysis::Structured(value),
        _ => CodeAnalysis::Raw(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use serde_json::json;

    #[test]
    fn parse_analysis_handles_fenced_json() {
        let fenced = "```json\n{\"summary\": \"ok\", \"issues\": []}\n```";
        assert_eq!(
            parse_analysis(fenced),
            CodeAnalysis::Structured(json!({"summary": "ok", "issues": []}))
        );
    }

    #[test]
    fn parse_analysis_falls_back_to_raw() {
        let text = "Looks fine to me.";
        assert_eq!(parse_analysis(text), CodeAnalysis::Raw(text.to_string()));
        // Bare JSON scalars are not an analysis object.
        assert_eq!(parse_analysis("42"), CodeAnalysis::Raw("42".to_string()));
    }

    #[tokio::test]
    async fn generate_returns_placeholder_on_failure() {
        let mock = Arc::new(MockProvider::new().with_error("connection refused"));
        let responder = LlmResponder::new(mock, LlmConfig::default());

        let text = responder.generate("hello").await;
        assert!(text.contains("unavailable"));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn chat_accumulates_history() {
        let mock = Arc::new(MockProvider::new().with_response("one").with_response("two"));
        let responder = LlmResponder::new(mock.clone(), LlmConfig::default());

        assert_eq!(responder.chat("first").await, "one");
        assert_eq!(responder.chat("second").await, "two");

        let calls = mock.captured_requests();
        // system + user, then system + user + assistant + user
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[1].len(), 4);
        assert_eq!(calls[1][2].content, "one");
        assert_eq!(calls[1][3].content, "second");
    }

    #[tokio::test]
    async fn failed_chat_turn_is_not_kept() {
        let mock = Arc::new(MockProvider::new().with_error("down").with_response("back"));
        let responder = LlmResponder::new(mock.clone(), LlmConfig::default());

        let _ = responder.chat("lost").await;
        responder.chat("retry").await;

        let calls = mock.captured_requests();
        assert_eq!(calls[1].len(), 2);
        assert_eq!(calls[1][1].content, "retry");
    }

    #[tokio::test]
    async fn analyze_code_structures_json_reply() {
        let mock = Arc::new(MockProvider::new().with_response(r#"{"summary":"tidy"}"#));
        let responder = LlmResponder::new(mock.clone(), LlmConfig::default());

        let analysis = responder.analyze_code("fn main() {}", "rust").await;
        assert_eq!(analysis, CodeAnalysis::Structured(json!({"summary": "tidy"})));
        assert!(mock.captured_requests()[0][1].content.contains("```rust"));
    }
}
