//! GitHub client — the moderation actions applied once a verdict is reached.
//!
//! Only two calls are needed: the REST endpoint that adds labels to an issue
//! (pull requests share the issue number space) and the GraphQL mutation that
//! minimizes a comment. Both sit behind `ModerationActions` so the orchestrator
//! can be exercised against a recording double.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

const MINIMIZE_COMMENT_MUTATION: &str = r#"
    mutation ($nodeId: ID!) {
      minimizeComment(input: { subjectId: $nodeId, classifier: SPAM }) {
        minimizedComment { isMinimized }
      }
    }"#;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),
}

/// `owner/name` of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parses `owner/name`. Returns `None` for anything else.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Side-effecting moderation actions.
#[async_trait]
pub trait ModerationActions: Send + Sync {
    /// Adds labels to an issue or pull request. No request is made when `labels` is empty.
    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError>;

    /// Hides a comment, classified as spam.
    async fn minimize_comment(&self, node_id: &str) -> Result<(), GitHubError>;
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// REST + GraphQL client authenticated with an installation or workflow token.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: String) -> Result<Self, GitHubError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String, GitHubError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header("accept", GITHUB_ACCEPT)
            .header("x-github-api-version", GITHUB_API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<GitHubErrorBody>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl ModerationActions for GitHubClient {
    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        if labels.is_empty() {
            return Ok(());
        }

        let path = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo.owner, repo.name, issue_number
        );
        self.post(&path, &json!({ "labels": labels })).await?;
        debug!("Labels {labels:?} added to {repo}#{issue_number}");
        Ok(())
    }

    async fn minimize_comment(&self, node_id: &str) -> Result<(), GitHubError> {
        let body = json!({
            "query": MINIMIZE_COMMENT_MUTATION,
            "variables": { "nodeId": node_id }
        });
        let text = self.post("/graphql", &body).await?;

        // GraphQL reports failures with a 200 status and an `errors` array.
        if let Ok(parsed) = serde_json::from_str::<GraphQlResponse>(&text) {
            if !parsed.errors.is_empty() {
                let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
                return Err(GitHubError::GraphQl(messages.join("; ")));
            }
        }

        debug!("Comment {node_id} minimized");
        Ok(())
    }
}
