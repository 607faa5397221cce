use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use wt_core::config::{Config, CredentialProvider};
use wt_core::remote::{IssueReporter, RemoteReader};
use wt_core::report_cache::ReportCache;
use wt_integrations::github::client::GitHubClient;
use wt_integrations::types::GitHubConfig;
use wt_intelligence::{
    AiResponder, AnthropicProvider, ConversationStore, LlmConfig, LlmError, LlmMessage,
    LlmProvider, LlmResponder, LlmResponse,
};
use wt_queue::{QueueConfig, TaskQueue};

use crate::chat::{ChatOrchestrator, ChatSettings};
use crate::detector::RuleDetector;
use crate::http_api::{api_router, ApiState};
use crate::scanner::{ScanOrchestrator, ScanSettings};

// ---------------------------------------------------------------------------
// ShutdownSignal
// ---------------------------------------------------------------------------

/// Cloneable trigger for a graceful stop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            info!("shutdown signal triggered");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `trigger` has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// OfflineProvider
// ---------------------------------------------------------------------------

/// Stands in for the LLM when no API key is configured. Every call fails,
/// so the responder answers with its placeholder text.
struct OfflineProvider;

#[async_trait]
impl LlmProvider for OfflineProvider {
    async fn complete(
        &self,
        _messages: &[LlmMessage],
        _config: &LlmConfig,
    ) -> Result<LlmResponse, LlmError> {
        Err(LlmError::ApiError {
            status: 401,
            message: "ANTHROPIC_API_KEY is not set".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Owns the queue, scanner and chat front-end and serves them over HTTP.
pub struct Daemon {
    config: Config,
    shutdown: ShutdownSignal,
    api_state: Arc<ApiState>,
}

impl Daemon {
    /// Build a daemon talking to GitHub and the LLM API, using credentials
    /// from the environment.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_credentials(
            config,
            CredentialProvider::github_token(),
            CredentialProvider::llm_api_key(),
        )
    }

    /// Like [`Daemon::new`] with explicit credentials. A GitHub token is
    /// required; without an LLM key the AI answers are placeholders.
    pub fn with_credentials(
        config: Config,
        github_token: Option<String>,
        llm_api_key: Option<String>,
    ) -> Result<Self> {
        let github_config = GitHubConfig::from_settings(&config.github, github_token)
            .context("github.owner and github.repo must be configured")?;
        let github = Arc::new(
            GitHubClient::new(github_config).context("failed to create GitHub client")?,
        );
        info!(owner = github.owner(), repo = github.repo(), "GitHub client ready");

        let provider: Arc<dyn LlmProvider> = match llm_api_key {
            Some(key) => {
                let mut provider = AnthropicProvider::new(key);
                if let Some(url) = &config.llm.base_url {
                    provider = provider.with_base_url(url.clone());
                }
                Arc::new(provider)
            }
            None => {
                warn!("ANTHROPIC_API_KEY not set, AI answers will be placeholders");
                Arc::new(OfflineProvider)
            }
        };
        let responder = Arc::new(LlmResponder::new(provider, LlmConfig::from(&config.llm)));

        Ok(Self::from_parts(
            config,
            github.clone(),
            Some(github as Arc<dyn IssueReporter>),
            responder,
        ))
    }

    /// Assemble a daemon from already-built collaborators.
    pub fn from_parts(
        config: Config,
        reader: Arc<dyn RemoteReader>,
        reporter: Option<Arc<dyn IssueReporter>>,
        responder: Arc<dyn AiResponder>,
    ) -> Self {
        let queue = Arc::new(TaskQueue::new(QueueConfig::from(&config.tasks)));
        let cache = Arc::new(ReportCache::new(reader.clone()).with_ttl(config.scan.cache_ttl()));

        let mut scanner = ScanOrchestrator::new(
            cache,
            reader,
            Arc::new(RuleDetector::default()),
            responder.clone(),
        )
        .with_settings(ScanSettings::from(&config.scan));
        if let Some(reporter) = reporter {
            scanner = scanner.with_reporter(reporter);
        }
        let scanner = Arc::new(scanner);

        let store = Arc::new(ConversationStore::new(config.chat.max_sessions));
        let chat = Arc::new(
            ChatOrchestrator::new(store, scanner.clone(), responder)
                .with_settings(ChatSettings::from_config(&config)),
        );

        let api_state = Arc::new(ApiState::new(queue, scanner, chat));
        Self {
            config,
            shutdown: ShutdownSignal::new(),
            api_state,
        }
    }

    /// Returns a handle that can be used to trigger shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn api_state(&self) -> &Arc<ApiState> {
        &self.api_state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.daemon.host, self.config.daemon.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        self.serve(listener).await
    }

    /// Start periodic scanning and serve the API on `listener` until the
    /// shutdown signal fires, then stop the scan loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        let scanner = self.api_state.scanner.clone();
        scanner.start_periodic(self.config.scan.interval()).await;

        info!(
            addr = %local,
            scan_interval_ms = self.config.scan.interval_ms,
            auto_fix = self.config.scan.enable_auto_fix,
            "watchtower daemon listening"
        );

        let shutdown = self.shutdown.clone();
        let served = axum::serve(listener, api_router(self.api_state.clone()))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await;

        scanner.stop_periodic().await;
        served.context("API server failed")?;
        info!("watchtower daemon stopped");
        Ok(())
    }
}
