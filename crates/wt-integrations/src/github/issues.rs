use async_trait::async_trait;
use tracing::info;
use wt_core::remote::{IssueReceipt, IssueReporter, RemoteError};

use super::client::{GitHubClient, Result};

/// Create a new issue.
pub async fn create_issue(
    client: &GitHubClient,
    title: &str,
    body: Option<&str>,
    labels: Option<Vec<String>>,
) -> Result<IssueReceipt> {
    let issue_handler = client.octocrab.issues(&client.owner, &client.repo);

    let mut builder = issue_handler.create(title);

    if let Some(b) = body {
        builder = builder.body(b);
    }

    if let Some(label_list) = labels {
        builder = builder.labels(label_list);
    }

    let issue = builder.send().await?;
    info!(number = issue.number, repo = %client.repo, "GitHub issue created");

    Ok(IssueReceipt {
        number: issue.number,
        url: issue.html_url.to_string(),
    })
}

#[async_trait]
impl IssueReporter for GitHubClient {
    async fn file_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> std::result::Result<IssueReceipt, RemoteError> {
        let labels = (!labels.is_empty()).then(|| labels.to_vec());
        Ok(create_issue(self, title, Some(body), labels).await?)
    }
}
