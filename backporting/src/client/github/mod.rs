//! GitHub-compatible client, shared by github.com, GitHub Enterprise and
//! Codeberg.

mod mapper;

use crate::client::infer::parse_github_url;
use crate::client::{BackportRequest, ClientError, GitClient, GitClientType, PullRequest};
use mapper::{map_pull_request, squash_commit_sha, RawCommit, RawCreated, RawPullRequest};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{Octocrab, Page};
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;

/// Page size requested when listing pull request commits.
const COMMITS_PER_PAGE: u8 = 100;

/// Client for GitHub-compatible REST APIs.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    api_url: String,
    /// Path of `api_url` (e.g. `/api/v1`), prepended to every route.
    path_prefix: String,
    client_type: GitClientType,
}

impl GitHubClient {
    /// Builds a client for the given API base URL.
    ///
    /// Requests are sent unauthenticated when no token is provided. Retries are
    /// disabled, every failed call surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidApiUrl`] if `api_url` is not an absolute
    /// URL, or [`ClientError::GitHubError`] if the HTTP client cannot be built.
    pub fn new(
        client_type: GitClientType,
        api_url: impl Into<String>,
        token: Option<&str>,
    ) -> Result<Self, ClientError> {
        // Several rustls providers may be compiled in; pin one before the
        // connector builds its TLS config. Already installed is fine.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let api_url = api_url.into().trim_end_matches('/').to_string();
        let parsed = Url::parse(&api_url).map_err(|e| ClientError::InvalidApiUrl {
            url: api_url.clone(),
            message: e.to_string(),
        })?;
        // Routes carry the path themselves, octocrab only gets the origin.
        let path_prefix = parsed.path().trim_end_matches('/').to_string();
        let mut builder = Octocrab::builder()
            .add_retry_config(RetryConfig::None)
            .base_uri(parsed.origin().ascii_serialization())?;
        if let Some(token) = token {
            builder = builder.personal_token(token.to_string());
        }

        Ok(Self {
            octocrab: builder.build()?,
            api_url,
            path_prefix,
            client_type,
        })
    }

    /// Returns the API base URL this client talks to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Repository route, including the API path prefix.
    fn repo_route(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}", self.path_prefix)
    }

    /// Decides squash mode when the caller did not.
    ///
    /// Open pull requests are treated as squashed. Otherwise a merge commit with
    /// exactly one parent means the pull request was squashed (or rebased) into
    /// it; anything else is treated as a true merge.
    async fn infer_squash(
        &self,
        owner: &str,
        repo: &str,
        raw: &RawPullRequest,
    ) -> Result<bool, ClientError> {
        if raw.is_open() {
            return Ok(true);
        }

        let Some(merge_sha) = raw.merge_commit_sha.as_deref() else {
            return Ok(false);
        };

        let route = format!("{}/commits/{merge_sha}", self.repo_route(owner, repo));
        let commit: RawCommit = self.octocrab.get(route, None::<&()>).await?;
        let parents = commit.parent_count();
        debug!(sha = %merge_sha, parents, "Inspected merge commit");
        Ok(parents == 1)
    }

    /// Lists the pull request commits, oldest first.
    ///
    /// Every page announced by the `Link` header is followed. GitHub lists at
    /// most 250 commits, so the result must match the pull request commit
    /// count.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        raw: &RawPullRequest,
    ) -> Result<Vec<String>, ClientError> {
        let number = raw.number;
        let route = format!(
            "{}/pulls/{number}/commits?per_page={COMMITS_PER_PAGE}",
            self.repo_route(owner, repo)
        );
        let mut page: Page<RawCommit> = self.octocrab.get(route, None::<&()>).await?;
        let mut commits = page.take_items();

        while let Some(mut next_page) = self.octocrab.get_page::<RawCommit>(&page.next).await? {
            commits.extend(next_page.take_items());
            page.next = next_page.next;
        }
        debug!(number, fetched = commits.len(), "Listed pull request commits");

        if let Some(expected) = raw.commits {
            let fetched = commits.len() as u64;
            if fetched < expected {
                return Err(ClientError::IncompleteCommitList {
                    number,
                    expected,
                    fetched,
                });
            }
        }

        Ok(commits.into_iter().map(|c| c.sha).collect())
    }

    async fn post(&self, route: String, body: Value) -> Result<Value, ClientError> {
        Ok(self.octocrab.post(route, Some(&body)).await?)
    }

    /// Applies reviewers, assignees, labels and comments to a created pull
    /// request. Failures are logged and never propagated.
    async fn decorate_pull_request(&self, request: &BackportRequest, number: u64) {
        let repo = self.repo_route(&request.owner, &request.repo);

        if !request.reviewers.is_empty() {
            let route = format!("{repo}/pulls/{number}/requested_reviewers");
            match self.post(route, json!({ "reviewers": request.reviewers })).await {
                Ok(_) => debug!(reviewers = ?request.reviewers, "Requested reviewers"),
                Err(e) => warn!(error = %e, "Failed to request reviewers"),
            }
        }

        if !request.assignees.is_empty() {
            let route = format!("{repo}/issues/{number}/assignees");
            match self.post(route, json!({ "assignees": request.assignees })).await {
                Ok(_) => debug!(assignees = ?request.assignees, "Set assignees"),
                Err(e) => warn!(error = %e, "Failed to set assignees"),
            }
        }

        if !request.labels.is_empty() {
            let route = format!("{repo}/issues/{number}/labels");
            match self.post(route, json!({ "labels": request.labels })).await {
                Ok(_) => debug!(labels = ?request.labels, "Added labels"),
                Err(e) => warn!(error = %e, "Failed to add labels"),
            }
        }

        for comment in &request.comments {
            let route = format!("{repo}/issues/{number}/comments");
            if let Err(e) = self.post(route, json!({ "body": comment })).await {
                warn!(error = %e, "Failed to post comment");
            }
        }
    }
}

impl GitClient for GitHubClient {
    fn client_type(&self) -> GitClientType {
        self.client_type
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        debug!(owner, repo, number, ?squash, "Fetching pull request");

        let route = format!("{}/pulls/{number}", self.repo_route(owner, repo));
        let raw: RawPullRequest = self.octocrab.get(route, None::<&()>).await?;

        let squash = match squash {
            Some(squash) => squash,
            None => self.infer_squash(owner, repo, &raw).await?,
        };

        let commits = if squash {
            vec![squash_commit_sha(&raw)?]
        } else {
            self.list_commits(owner, repo, &raw).await?
        };

        map_pull_request(raw, commits)
    }

    async fn get_pull_request_from_url(
        &self,
        url: &str,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        let coords = parse_github_url(url)?;
        self.get_pull_request(&coords.owner, &coords.project, coords.number, squash)
            .await
    }

    async fn create_pull_request(&self, request: &BackportRequest) -> Result<String, ClientError> {
        let span = info_span!(
            "create_pull_request",
            repo = %format!("{}/{}", request.owner, request.repo),
            head = %request.head,
            base = %request.base
        );

        async {
            info!("Creating backport pull request");

            let route = format!("{}/pulls", self.repo_route(&request.owner, &request.repo));
            let body = json!({
                "head": request.head,
                "base": request.base,
                "title": request.title,
                "body": request.body,
            });
            let created: RawCreated = self.octocrab.post(route, Some(&body)).await?;
            let number = created.number.ok_or(ClientError::MissingField {
                field: "number",
                context: "create pull request",
            })?;

            info!(pr_number = number, url = %created.html_url, "Pull request created");
            self.decorate_pull_request(request, number).await;

            Ok(created.html_url)
        }
        .instrument(span)
        .await
    }

    async fn create_pull_request_comment(&self, url: &str, comment: &str) -> Option<String> {
        let result = async {
            let coords = parse_github_url(url)?;
            let route = format!(
                "{}/issues/{}/comments",
                self.repo_route(&coords.owner, &coords.project),
                coords.number
            );
            let created: RawCreated = self
                .octocrab
                .post(route, Some(&json!({ "body": comment })))
                .await?;
            Ok::<_, ClientError>(created.html_url)
        }
        .await;

        match result {
            Ok(comment_url) => {
                info!(url = %comment_url, "Comment posted");
                Some(comment_url)
            }
            Err(e) => {
                error!(pr = %url, error = %e, "Failed to post comment");
                None
            }
        }
    }
}
