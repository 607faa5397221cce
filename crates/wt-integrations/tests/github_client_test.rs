//! GitHub client construction and its use behind the collaborator traits.

use std::sync::Arc;

use wt_core::config::GitHubSettings;
use wt_core::remote::{IssueReporter, RemoteError, RemoteReader};
use wt_integrations::github::client::{GitHubClient, GitHubError};
use wt_integrations::types::GitHubConfig;

fn settings() -> GitHubSettings {
    GitHubSettings {
        owner: Some("acme".to_string()),
        repo: Some("site".to_string()),
        branch: None,
    }
}

#[tokio::test]
async fn client_from_settings_serves_both_traits() {
    let config = GitHubConfig::from_settings(&settings(), Some("ghp_test".to_string())).unwrap();
    let client = Arc::new(GitHubClient::new(config).unwrap());

    let reader: Arc<dyn RemoteReader> = client.clone();
    let reporter: Arc<dyn IssueReporter> = client.clone();
    drop((reader, reporter));

    assert_eq!(client.owner(), "acme");
    assert_eq!(client.repo(), "site");
    assert_eq!(client.branch(), None);
}

#[test]
fn missing_token_is_an_auth_error() {
    let config = GitHubConfig::from_settings(&settings(), None).unwrap();
    let err = GitHubClient::new(config).unwrap_err();
    assert!(matches!(err, GitHubError::MissingToken));
    assert!(matches!(RemoteError::from(err), RemoteError::Auth(_)));
}

#[test]
fn directory_read_is_a_decode_error() {
    let err = GitHubError::NotAFile("src".to_string());
    assert_eq!(err.status(), None);
    match RemoteError::from(err) {
        RemoteError::Decode(msg) => assert!(msg.contains("src is a directory")),
        other => panic!("unexpected error: {other:?}"),
    }
}
