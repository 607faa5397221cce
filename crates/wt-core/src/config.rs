use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration loaded from `~/.watchtower/config.toml`.
///
/// **Security**: This struct NEVER stores API keys or tokens. Credentials
/// are read from environment variables at runtime through
/// [`CredentialProvider`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub tasks: TaskDefaultsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load config from `WATCHTOWER_CONFIG` or `~/.watchtower/config.toml`,
    /// falling back to defaults when the file does not exist. Environment
    /// overrides are applied on top.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WATCHTOWER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut cfg = if path.exists() {
            Self::read_file(&path)?
        } else {
            Config::default()
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let cfg = Self::read_file(&path.into())?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn read_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply the recognised environment overrides.
    ///
    /// `lookup` abstracts `std::env::var` so tests can feed a fixed map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SCAN_INTERVAL") {
            self.scan.interval_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("SCAN_INTERVAL must be milliseconds, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup("ENABLE_AUTO_FIX") {
            self.scan.enable_auto_fix = parse_flag(&raw);
        }
        if let Some(raw) = lookup("PORT") {
            self.daemon.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT must be a u16, got {raw:?}")))?;
        }
        if let Some(owner) = lookup("GITHUB_OWNER") {
            self.github.owner = Some(owner);
        }
        if let Some(repo) = lookup("GITHUB_REPO") {
            self.github.repo = Some(repo);
        }
        if let Some(branch) = lookup("GITHUB_BRANCH") {
            self.github.branch = Some(branch);
        }
        Ok(())
    }

    /// Semantic validation for settings that are not expressible via types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "scan.interval_ms must be greater than zero".into(),
            ));
        }
        if self.tasks.max_retries == 0 {
            return Err(ConfigError::Validation(
                "tasks.max_retries must be at least 1".into(),
            ));
        }
        if self.chat.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "chat.max_sessions must be at least 1".into(),
            ));
        }
        if !matches!(self.general.log_format.as_str(), "human" | "json") {
            return Err(ConfigError::Validation(format!(
                "general.log_format must be \"human\" or \"json\", got {:?}",
                self.general.log_format
            )));
        }
        Ok(())
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".watchtower")
            .join("config.toml")
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `human` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_project_name() -> String {
    "watchtower".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "human".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Periodic scan cadence in milliseconds (`SCAN_INTERVAL`).
    #[serde(default = "default_scan_interval_ms")]
    pub interval_ms: u64,
    /// File a GitHub issue after a scan that found problems (`ENABLE_AUTO_FIX`).
    #[serde(default)]
    pub enable_auto_fix: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_analyzed_files")]
    pub max_analyzed_files: usize,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_scan_interval_ms(),
            enable_auto_fix: false,
            cache_ttl_secs: default_cache_ttl_secs(),
            max_analyzed_files: default_max_analyzed_files(),
            source_extensions: default_source_extensions(),
        }
    }
}

fn default_scan_interval_ms() -> u64 {
    3_600_000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_max_analyzed_files() -> usize {
    5
}
fn default_source_extensions() -> Vec<String> {
    ["rs", "js", "ts", "jsx", "tsx", "py", "go", "java", "rb"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Defaults applied to submitted tasks that leave a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefaultsConfig {
    #[serde(default = "default_task_priority")]
    pub default_priority: i32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Base of the linear backoff; attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for TaskDefaultsConfig {
    fn default() -> Self {
        Self {
            default_priority: default_task_priority(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_task_priority() -> i32 {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}
fn default_history_limit() -> usize {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Live conversations kept before the least recently used is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Earlier messages included in the prompt context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            context_window: default_context_window(),
        }
    }
}

fn default_max_sessions() -> usize {
    1_000
}
fn default_context_window() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitHubSettings {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    /// Ref to read contents from; the repository default branch when unset.
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            base_url: None,
        }
    }
}

fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_llm_max_tokens() -> u32 {
    1024
}
fn default_llm_temperature() -> f32 {
    0.3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_host")]
    pub host: String,
    #[serde(default = "default_daemon_port")]
    pub port: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_daemon_host(),
            port: default_daemon_port(),
        }
    }
}

fn default_daemon_host() -> String {
    "127.0.0.1".into()
}
fn default_daemon_port() -> u16 {
    3000
}

// ---------------------------------------------------------------------------
// CredentialProvider
// ---------------------------------------------------------------------------

/// Resolves secrets from the environment at the point of use.
pub struct CredentialProvider;

impl CredentialProvider {
    /// GitHub personal access token from `GITHUB_TOKEN`.
    pub fn github_token() -> Option<String> {
        Self::non_empty("GITHUB_TOKEN")
    }

    /// LLM API key from `ANTHROPIC_API_KEY`.
    pub fn llm_api_key() -> Option<String> {
        Self::non_empty("ANTHROPIC_API_KEY")
    }

    fn non_empty(var: &str) -> Option<String> {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn env_overrides_scan_settings() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(lookup_from(&[
            ("SCAN_INTERVAL", "60000"),
            ("ENABLE_AUTO_FIX", "true"),
            ("GITHUB_OWNER", "octo"),
            ("GITHUB_REPO", "widgets"),
        ]))
        .unwrap();

        assert_eq!(cfg.scan.interval_ms, 60_000);
        assert!(cfg.scan.enable_auto_fix);
        assert_eq!(cfg.github.owner.as_deref(), Some("octo"));
        assert_eq!(cfg.github.repo.as_deref(), Some("widgets"));
    }

    #[test]
    fn env_override_rejects_bad_interval() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides(lookup_from(&[("SCAN_INTERVAL", "hourly")]))
            .unwrap_err();
        assert!(err.to_string().contains("SCAN_INTERVAL"));
    }

    #[test]
    fn zero_retries_fails_validation() {
        let mut cfg = Config::default();
        cfg.tasks.max_retries = 0;
        assert!(cfg.validate().is_err());
    }
}
