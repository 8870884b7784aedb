//! GitHub Actions implementation of the ciartifact CI service.
//!
//! [`GitHubClient`] talks to the GitHub REST API (or a GitHub Enterprise
//! server) to look up branch heads, list workflow runs and their artifacts,
//! and download artifact archives. Any response other than `200 OK` is
//! reported as [`Error::Remote`] with the status attached.

use async_trait::async_trait;
use bytes::Bytes;
use ciartifact_core::{Artifact, CiService, Error, RepositoryRef, Result, WorkflowRun};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "ciartifact";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsPage {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct ArtifactsPage {
    artifacts: Vec<Artifact>,
}

/// [`CiService`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    /// Client for api.github.com.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is not a valid header value
    /// or the HTTP client cannot be initialised.
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Client for the API rooted at `base_url`, e.g.
    /// `https://github.example.com/api/v3`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid, the token is not
    /// a valid header value, or the HTTP client cannot be initialised.
    pub fn with_base_url(base_url: &str, token: Option<&str>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            Error::configuration(format!("Invalid GitHub API URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "Invalid GitHub API URL '{base_url}': not a base URL"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::configuration("GitHub token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create GitHub client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// `<base>/repos/<owner>/<repo>/<segments...>`, each segment escaped.
    fn repo_url<'s>(
        &self,
        repo: &RepositoryRef,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::configuration(format!("Invalid GitHub API URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()])
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        operation: &str,
        repo: &RepositoryRef,
        url: Url,
    ) -> Result<reqwest::Response> {
        debug!(%url, operation, "GitHub API request");

        let response = self.client.get(url).send().await.map_err(|e| {
            Error::remote(
                operation,
                repo.to_string(),
                e.status().map(|s| s.as_u16()),
                e.to_string(),
            )
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unexpected status").to_string()
            } else {
                body
            };
            return Err(Error::remote(
                operation,
                repo.to_string(),
                Some(status.as_u16()),
                message,
            ));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        repo: &RepositoryRef,
        url: Url,
    ) -> Result<T> {
        self.get(operation, repo, url)
            .await?
            .json()
            .await
            .map_err(|e| {
                Error::remote(
                    operation,
                    repo.to_string(),
                    None,
                    format!("invalid response body: {e}"),
                )
            })
    }
}

#[async_trait]
impl CiService for GitHubClient {
    async fn get_ref(&self, repo: &RepositoryRef, reference: &str) -> Result<String> {
        let url = self.repo_url(repo, ["git", "ref"].into_iter().chain(reference.split('/')))?;
        let git_ref: GitRef = self.get_json("fetch repository HEAD", repo, url).await?;
        Ok(git_ref.object.sha)
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>> {
        // Filtering by status server-side is unreliable, so every run of the
        // branch is fetched and filtered by the caller.
        let mut url = self.repo_url(repo, ["actions", "workflows", workflow, "runs"])?;
        url.query_pairs_mut().append_pair("branch", branch);
        let page: WorkflowRunsPage = self.get_json("fetch workflow runs", repo, url).await?;
        Ok(page.workflow_runs)
    }

    async fn list_run_artifacts(&self, repo: &RepositoryRef, run_id: u64) -> Result<Vec<Artifact>> {
        let run_id = run_id.to_string();
        let url = self.repo_url(repo, ["actions", "runs", run_id.as_str(), "artifacts"])?;
        let page: ArtifactsPage = self
            .get_json("fetch workflow run artifacts", repo, url)
            .await?;
        Ok(page.artifacts)
    }

    async fn download_artifact(
        &self,
        repo: &RepositoryRef,
        artifact_id: u64,
        format: &str,
    ) -> Result<Bytes> {
        const OPERATION: &str = "download workflow run artifact";

        let artifact_id = artifact_id.to_string();
        let url = self.repo_url(repo, ["actions", "artifacts", artifact_id.as_str(), format])?;
        self.get(OPERATION, repo, url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::remote(OPERATION, repo.to_string(), None, e.to_string()))
    }
}
