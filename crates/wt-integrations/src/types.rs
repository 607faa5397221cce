use serde::{Deserialize, Serialize};
use wt_core::config::GitHubSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    /// Ref to read contents from. `None` means the default branch.
    #[serde(default)]
    pub branch: Option<String>,
}

impl GitHubConfig {
    /// Combine the `[github]` settings with a token. `None` when the
    /// repository is not fully configured.
    pub fn from_settings(settings: &GitHubSettings, token: Option<String>) -> Option<Self> {
        Some(Self {
            token,
            owner: settings.owner.clone()?,
            repo: settings.repo.clone()?,
            branch: settings.branch.clone(),
        })
    }
}
