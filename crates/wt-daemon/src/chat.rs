use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};
use wt_core::config::{ChatConfig, Config};
use wt_core::types::{Report, Severity};
use wt_intelligence::{
    AiResponder, ChatMessage, ChatRole, Conversation, ConversationStore, ProjectContext,
};

use crate::scanner::ScanOrchestrator;

pub const HELP_TEXT: &str = "Available commands:\n\
/scan - run a project scan now\n\
/status - show project size and the last scan\n\
/issues - list issues from the latest scan\n\
/help - show this message\n\
Anything else is answered by the AI assistant.";

// ---------------------------------------------------------------------------
// ChatCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Scan,
    Status,
    Issues,
    Help,
}

impl ChatCommand {
    /// Recognise a command by prefix on the trimmed message.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        [
            ("/scan", ChatCommand::Scan),
            ("/status", ChatCommand::Status),
            ("/issues", ChatCommand::Issues),
            ("/help", ChatCommand::Help),
        ]
        .into_iter()
        .find_map(|(prefix, cmd)| text.starts_with(prefix).then_some(cmd))
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub project_name: String,
    /// Earlier messages included in the AI prompt.
    pub context_window: usize,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_name: config.general.project_name.clone(),
            context_window: config.chat.context_window,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            project_name: "watchtower".to_string(),
            context_window: ChatConfig::default().context_window,
        }
    }
}

// ---------------------------------------------------------------------------
// ChatOrchestrator
// ---------------------------------------------------------------------------

/// Routes chat turns to slash commands or the AI responder.
pub struct ChatOrchestrator {
    store: Arc<ConversationStore>,
    scanner: Arc<ScanOrchestrator>,
    responder: Arc<dyn AiResponder>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        scanner: Arc<ScanOrchestrator>,
        responder: Arc<dyn AiResponder>,
    ) -> Self {
        Self {
            store,
            scanner,
            responder,
            settings: ChatSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Handle one user turn and return the assistant's reply.
    ///
    /// Never fails: a failing command is answered with an apology that is
    /// recorded like any other reply.
    pub async fn process_message(&self, session_id: &str, text: &str) -> ChatMessage {
        if self.store.ensure(session_id).await {
            info!(session_id, "conversation created");
        }
        self.load_context(session_id).await;

        let earlier = self
            .store
            .recent(session_id, self.settings.context_window)
            .await;
        self.store.append(session_id, ChatRole::User, text).await;

        let reply = match self.dispatch(session_id, text, &earlier).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id, error = %e, "chat turn failed");
                format!("Sorry, I encountered an error: {e}")
            }
        };
        self.store.append(session_id, ChatRole::Assistant, reply).await
    }

    /// Attach the project context on first use. A failed load is retried
    /// on the next turn.
    async fn load_context(&self, session_id: &str) {
        if self.store.project_context(session_id).await.is_some() {
            return;
        }
        match self.scanner.cache().get().await {
            Ok(structure) => {
                let context = ProjectContext::from_structure(&structure);
                self.store.set_project_context(session_id, context).await;
                debug!(session_id, "project context loaded");
            }
            Err(e) => warn!(session_id, error = %e, "could not load project context"),
        }
    }

    async fn dispatch(
        &self,
        session_id: &str,
        text: &str,
        earlier: &[ChatMessage],
    ) -> Result<String> {
        match ChatCommand::parse(text) {
            Some(ChatCommand::Scan) => {
                let report = self.scanner.perform_scan().await?;
                Ok(scan_summary(&report))
            }
            Some(ChatCommand::Status) => self.status().await,
            Some(ChatCommand::Issues) => {
                let report = match self.scanner.get_last().await {
                    Some(report) => report,
                    None => self.scanner.perform_scan().await?,
                };
                Ok(issue_list(&report))
            }
            Some(ChatCommand::Help) => Ok(HELP_TEXT.to_string()),
            None => {
                let context = self.store.project_context(session_id).await;
                let prompt = self.build_prompt(context.as_ref(), earlier, text);
                Ok(self.responder.generate(&prompt).await)
            }
        }
    }

    async fn status(&self) -> Result<String> {
        let structure = self.scanner.cache().get().await?;
        let mut status = format!(
            "Project {}: {} files, {} directories.",
            self.settings.project_name,
            structure.files.len(),
            structure.directories.len()
        );
        match self.scanner.get_last().await {
            Some(report) => {
                let _ = write!(
                    status,
                    " Last scan at {} found {} issues.",
                    report.timestamp.to_rfc3339(),
                    report.issue_count()
                );
            }
            None => status.push_str(" No scan has run yet."),
        }
        Ok(status)
    }

    fn build_prompt(
        &self,
        context: Option<&ProjectContext>,
        earlier: &[ChatMessage],
        text: &str,
    ) -> String {
        let mut prompt = format!(
            "You are the assistant for the project \"{}\".\n",
            self.settings.project_name
        );
        match context {
            Some(ctx) => {
                let _ = writeln!(
                    prompt,
                    "The project has {} files and {} directories.",
                    ctx.file_count, ctx.dir_count
                );
            }
            None => prompt.push_str("The project structure is not available yet.\n"),
        }
        if !earlier.is_empty() {
            prompt.push_str("\nRecent conversation:\n");
            for msg in earlier {
                let role = match msg.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                };
                let _ = writeln!(prompt, "{role}: {}", msg.content);
            }
        }
        let _ = write!(prompt, "\nUser: {text}");
        prompt
    }

    // ------------------------------------------------------------------
    // Session management
    // ------------------------------------------------------------------

    pub async fn start(&self, session_id: &str) -> Conversation {
        self.store.start(session_id).await
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.store.history(session_id).await
    }

    pub async fn clear(&self, session_id: &str) -> bool {
        self.store.clear(session_id).await
    }

    pub async fn active_count(&self) -> usize {
        self.store.active_count().await
    }
}

fn scan_summary(report: &Report) -> String {
    let mut summary = format!(
        "Scan complete: {} files, {} directories, {} issues ({} high, {} medium, {} low).",
        report.structure.files.len(),
        report.structure.directories.len(),
        report.issue_count(),
        report.count_by_severity(Severity::High),
        report.count_by_severity(Severity::Medium),
        report.count_by_severity(Severity::Low),
    );
    if let Some(top) = report.recommendations.first() {
        let _ = write!(summary, "\nTop recommendation: {}", top.suggestion);
    }
    summary
}

fn issue_list(report: &Report) -> String {
    if report.issues.is_empty() {
        return "No issues found in the latest scan.".to_string();
    }
    let mut list = format!("{} issues found:\n", report.issue_count());
    for issue in &report.issues {
        let _ = writeln!(list, "- [{}] {}: {}", issue.severity, issue.file, issue.message);
    }
    list.trim_end().to_string()
}
