use async_trait::async_trait;
use octocrab::models::repos::Content;
use tracing::debug;
use wt_core::remote::{RemoteError, RemoteReader};
use wt_core::types::{EntryKind, RemoteEntry};

use super::client::{GitHubClient, GitHubError, Result};

/// List the entries under `path` through the repository contents API.
pub async fn list_contents(client: &GitHubClient, path: &str) -> Result<Vec<Content>> {
    let repo = client.octocrab.repos(&client.owner, &client.repo);
    let mut request = repo.get_content().path(path);
    if let Some(branch) = &client.branch {
        request = request.r#ref(branch);
    }
    let items = request.send().await?.items;
    debug!(path, count = items.len(), "listed repository contents");
    Ok(items)
}

/// Fetch and decode one file's body.
pub async fn read_file(client: &GitHubClient, path: &str) -> Result<String> {
    let mut items = list_contents(client, path).await?;
    // A directory path lists its children instead of returning one file.
    if items.len() != 1 || items[0].r#type != "file" {
        return Err(GitHubError::NotAFile(path.to_string()));
    }
    let item = items.remove(0);
    item.decoded_content()
        .ok_or_else(|| GitHubError::Decode(item.path.clone()))
}

pub(crate) fn content_to_entry(item: Content) -> RemoteEntry {
    let kind = match item.r#type.as_str() {
        "dir" | "submodule" => EntryKind::Dir,
        _ => EntryKind::File,
    };
    RemoteEntry {
        name: item.name,
        path: item.path,
        size: match kind {
            EntryKind::File => u64::try_from(item.size).ok(),
            EntryKind::Dir => None,
        },
        kind,
    }
}

#[async_trait]
impl RemoteReader for GitHubClient {
    async fn list(&self, path: &str) -> std::result::Result<Vec<RemoteEntry>, RemoteError> {
        let items = list_contents(self, path).await?;
        Ok(items.into_iter().map(content_to_entry).collect())
    }

    async fn read_file(&self, path: &str) -> std::result::Result<String, RemoteError> {
        Ok(read_file(self, path).await?)
    }
}
