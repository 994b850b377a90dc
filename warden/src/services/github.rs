//! Hosted repository client for GitHub-style APIs

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::error::{WardenError, WardenResult};
use crate::traits::RemoteRepository;
use shared::{Component, Revision, component_debug};

const USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
}

/// Repository client using the commits API and branch archive downloads
pub struct GitHubRepository {
    client: reqwest::Client,
    api_base: Url,
    archive_base: Url,
    slug: String,
    query_timeout: Duration,
    download_timeout: Duration,
}

impl GitHubRepository {
    pub fn new(slug: impl Into<String>, api_base: Url, archive_base: Url) -> WardenResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WardenError::remote(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            archive_base,
            slug: slug.into(),
            query_timeout: QUERY_TIMEOUT,
            download_timeout: DOWNLOAD_TIMEOUT,
        })
    }

    /// Override both request timeouts (fluent API)
    pub fn with_timeouts(mut self, query: Duration, download: Duration) -> Self {
        self.query_timeout = query;
        self.download_timeout = download;
        self
    }

    pub fn commit_url(&self, branch: &str) -> String {
        format!(
            "{}/repos/{}/commits/{}",
            self.api_base.as_str().trim_end_matches('/'),
            self.slug,
            branch
        )
    }

    pub fn archive_url(&self, branch: &str) -> String {
        format!(
            "{}/{}/archive/refs/heads/{}.zip",
            self.archive_base.as_str().trim_end_matches('/'),
            self.slug,
            branch
        )
    }
}

#[async_trait]
impl RemoteRepository for GitHubRepository {
    async fn latest_revision(&self, branch: &str) -> WardenResult<Revision> {
        let url = self.commit_url(branch);
        component_debug!(Component::Updater, "Querying {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(|e| WardenError::remote(e.to_string()))?
            .error_for_status()
            .map_err(|e| WardenError::remote(e.to_string()))?;

        let payload: CommitPayload = response
            .json()
            .await
            .map_err(|e| WardenError::remote(format!("Malformed commit response: {e}")))?;

        Revision::parse(&payload.sha).ok_or_else(|| WardenError::remote("Commit response has an empty sha"))
    }

    async fn download_snapshot(&self, branch: &str) -> WardenResult<Vec<u8>> {
        let url = self.archive_url(branch);
        component_debug!(Component::Updater, "Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| WardenError::remote(e.to_string()))?
            .error_for_status()
            .map_err(|e| WardenError::remote(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WardenError::remote(format!("Archive download interrupted: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(api: &str, archive: &str) -> GitHubRepository {
        GitHubRepository::new(
            "acme/transit-board",
            Url::parse(api).unwrap(),
            Url::parse(archive).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_commit_url() {
        let repo = repository("https://api.github.com", "https://github.com");
        assert_eq!(
            repo.commit_url("main"),
            "https://api.github.com/repos/acme/transit-board/commits/main"
        );
    }

    #[test]
    fn test_archive_url_ignores_trailing_slash() {
        let repo = repository("https://api.github.com/", "https://github.com/");
        assert_eq!(
            repo.archive_url("main"),
            "https://github.com/acme/transit-board/archive/refs/heads/main.zip"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_error() {
        let repo = repository("http://127.0.0.1:9", "http://127.0.0.1:9")
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));

        let result = repo.latest_revision("main").await;
        assert!(matches!(result, Err(WardenError::RemoteQuery { .. })));
    }
}
