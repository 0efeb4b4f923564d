//! Git hosting service clients.
//!
//! [`GitClient`] is the capability set the backport pipeline needs from a
//! host. GitHub, GitHub Enterprise and Codeberg share [`GitHubClient`]; GitLab
//! has its own [`GitLabClient`]. [`build_git_client`] selects one from the
//! inferred host type.

mod error;
mod github;
mod gitlab;
mod infer;
mod types;

pub use error::ClientError;
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use infer::{
    default_api_version, infer_git_api_url, infer_git_client, parse_github_url, parse_gitlab_url,
    PullRequestCoordinates, DEFAULT_API_VERSION, PUBLIC_GITHUB_API_URL,
};
pub use types::{BackportRequest, GitClientType, GitRepository, PullRequest, PullRequestState};

use tracing::info;

/// Operations the backport pipeline performs against a git host.
#[allow(async_fn_in_trait)]
pub trait GitClient {
    /// Host type served by this client.
    fn client_type(&self) -> GitClientType;

    /// Name used for local commits when none is configured.
    fn default_git_user(&self) -> &'static str {
        match self.client_type() {
            GitClientType::GitHub => "GitHub",
            GitClientType::GitLab => "Gitlab",
            GitClientType::Codeberg => "Codeberg",
        }
    }

    /// Email used for local commits when none is configured.
    fn default_git_email(&self) -> &'static str {
        match self.client_type() {
            GitClientType::GitHub => "noreply@github.com",
            GitClientType::GitLab => "noreply@gitlab.com",
            GitClientType::Codeberg => "noreply@codeberg.org",
        }
    }

    /// Fetches a pull request.
    ///
    /// `squash` selects which commits end up in [`PullRequest::commits`]:
    /// `Some(true)` a single representative commit, `Some(false)` the full
    /// list, `None` infers it from the merge commit.
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError>;

    /// Fetches a pull request from its web or API URL.
    async fn get_pull_request_from_url(
        &self,
        url: &str,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError>;

    /// Creates a backport pull request and returns its browser URL.
    ///
    /// Reviewers, assignees, labels and comments are applied best-effort.
    async fn create_pull_request(&self, request: &BackportRequest) -> Result<String, ClientError>;

    /// Posts a comment on the pull request at `url`, returning the comment URL.
    ///
    /// Failures are logged and reported as `None`.
    async fn create_pull_request_comment(&self, url: &str, comment: &str) -> Option<String>;
}

/// A client for one of the supported hosts.
#[derive(Debug, Clone)]
pub enum HostClient {
    GitHub(GitHubClient),
    GitLab(GitLabClient),
}

impl GitClient for HostClient {
    fn client_type(&self) -> GitClientType {
        match self {
            Self::GitHub(c) => c.client_type(),
            Self::GitLab(c) => c.client_type(),
        }
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        match self {
            Self::GitHub(c) => c.get_pull_request(owner, repo, number, squash).await,
            Self::GitLab(c) => c.get_pull_request(owner, repo, number, squash).await,
        }
    }

    async fn get_pull_request_from_url(
        &self,
        url: &str,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        match self {
            Self::GitHub(c) => c.get_pull_request_from_url(url, squash).await,
            Self::GitLab(c) => c.get_pull_request_from_url(url, squash).await,
        }
    }

    async fn create_pull_request(&self, request: &BackportRequest) -> Result<String, ClientError> {
        match self {
            Self::GitHub(c) => c.create_pull_request(request).await,
            Self::GitLab(c) => c.create_pull_request(request).await,
        }
    }

    async fn create_pull_request_comment(&self, url: &str, comment: &str) -> Option<String> {
        match self {
            Self::GitHub(c) => c.create_pull_request_comment(url, comment).await,
            Self::GitLab(c) => c.create_pull_request_comment(url, comment).await,
        }
    }
}

/// Builds the client for a host type.
///
/// # Errors
///
/// Returns [`ClientError`] if the underlying HTTP client cannot be built.
pub fn build_git_client(
    client_type: GitClientType,
    api_url: &str,
    token: Option<&str>,
) -> Result<HostClient, ClientError> {
    info!(client = %client_type, api_url, "Setting up git client");

    match client_type {
        GitClientType::GitHub | GitClientType::Codeberg => Ok(HostClient::GitHub(
            GitHubClient::new(client_type, api_url, token)?,
        )),
        GitClientType::GitLab => Ok(HostClient::GitLab(GitLabClient::new(api_url, token)?)),
    }
}
