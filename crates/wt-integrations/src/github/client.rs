use octocrab::Octocrab;
use thiserror::Error;
use wt_core::remote::RemoteError;

use crate::types::GitHubConfig;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("missing GitHub token, set GITHUB_TOKEN")]
    MissingToken,

    #[error("could not decode content of {0}")]
    Decode(String),

    #[error("{0} is a directory, not a file")]
    NotAFile(String),
}

impl GitHubError {
    /// HTTP status reported by the API, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Api(octocrab::Error::GitHub { source, .. }) => {
                Some(source.status_code.as_u16())
            }
            _ => None,
        }
    }
}

impl From<GitHubError> for RemoteError {
    fn from(err: GitHubError) -> Self {
        let message = err.to_string();
        match (&err, err.status()) {
            (GitHubError::MissingToken, _) => RemoteError::Auth(message),
            (GitHubError::Decode(_) | GitHubError::NotAFile(_), _) => RemoteError::Decode(message),
            (_, Some(401 | 403)) => RemoteError::Auth(message),
            (_, Some(404)) => RemoteError::NotFound(message),
            (GitHubError::Api(octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }), _) => {
                RemoteError::Decode(message)
            }
            _ => RemoteError::Network(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    pub(crate) octocrab: Octocrab,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) branch: Option<String>,
}

impl GitHubClient {
    /// Create a new `GitHubClient` from an explicit [`GitHubConfig`].
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let token = config.token.ok_or(GitHubError::MissingToken)?;

        let octocrab = Octocrab::builder().personal_token(token).build()?;

        Ok(Self {
            octocrab,
            owner: config.owner,
            repo: config.repo,
            branch: config.branch,
        })
    }

    /// Returns a reference to the inner `Octocrab` instance.
    pub fn inner(&self) -> &Octocrab {
        &self.octocrab
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_failures_map_to_remote_errors() {
        assert!(matches!(
            RemoteError::from(GitHubError::MissingToken),
            RemoteError::Auth(_)
        ));
        assert!(matches!(
            RemoteError::from(GitHubError::Decode("a.png".into())),
            RemoteError::Decode(_)
        ));
        assert!(matches!(
            RemoteError::from(GitHubError::NotAFile("src".into())),
            RemoteError::Decode(_)
        ));
    }
}
