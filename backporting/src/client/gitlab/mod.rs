//! GitLab merge request client.

mod mapper;

use crate::client::infer::{parse_gitlab_url, PullRequestCoordinates};
use crate::client::{BackportRequest, ClientError, GitClient, GitClientType, PullRequest};
use mapper::{
    map_merge_request, squash_commit_sha, RawCommit, RawMergeRequest, RawNote, RawProject,
    RawUser,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Page size requested from list endpoints (the GitLab maximum).
const PER_PAGE: u32 = 100;

/// Header carrying the next page number, empty on the last page.
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Client for the GitLab REST API (v4).
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitLabClient {
    /// Builds a client for the given API base URL, e.g.
    /// `https://gitlab.com/api/v4`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpError`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, token: Option<&str>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("backporting/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    /// Returns the API base URL this client talks to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Resolves the numeric ID of a project from its namespace and name.
    ///
    /// Namespaces may be arbitrarily nested (`group/subgroup`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the project cannot be fetched.
    pub async fn get_project_id(&self, namespace: &str, project: &str) -> Result<u64, ClientError> {
        let path = if namespace.is_empty() {
            project.to_string()
        } else {
            format!("{namespace}/{project}")
        };
        Ok(self.get_project(&path).await?.id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request, turning non-success statuses into [`ClientError::ApiError`].
    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let mut request = self.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError {
                method: method.as_str().to_string(),
                url,
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        Ok(self.execute(method, url, body).await?.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, ClientError> {
        self.send(Method::GET, url, None).await
    }

    /// Builds `/projects/:id` where `:id` is a numeric ID or an URL-encoded path.
    fn project_route(&self, id_or_path: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id_or_path.as_bytes()).collect();
        format!("{}/projects/{encoded}", self.api_url)
    }

    async fn get_project(&self, id_or_path: &str) -> Result<RawProject, ClientError> {
        self.get(self.project_route(id_or_path)).await
    }

    /// Decides squash mode when the caller did not.
    ///
    /// Open merge requests are treated as squashed. Otherwise the merge (or
    /// squash) commit is inspected and a single parent means squashed.
    async fn infer_squash(&self, project: &str, raw: &RawMergeRequest) -> Result<bool, ClientError> {
        if raw.is_open() {
            return Ok(true);
        }

        let Some(sha) = raw
            .merge_commit_sha
            .as_deref()
            .or(raw.squash_commit_sha.as_deref())
        else {
            return Ok(false);
        };

        let url = format!("{}/repository/commits/{sha}", self.project_route(project));
        let commit: RawCommit = self.get(url).await?;
        let parents = commit.parent_ids.as_ref().map_or(0, Vec::len);
        debug!(sha, parents, "Inspected merge commit");
        Ok(parents == 1)
    }

    /// Lists the merge request commits, oldest first.
    ///
    /// Every page is fetched; GitLab serves them newest first.
    async fn list_commits(&self, project: &str, iid: u64) -> Result<Vec<String>, ClientError> {
        let route = format!(
            "{}/merge_requests/{iid}/commits",
            self.project_route(project)
        );

        let mut commits: Vec<String> = Vec::new();
        let mut page: u32 = 1;
        loop {
            let url = format!("{route}?per_page={PER_PAGE}&page={page}");
            let response = self.execute(Method::GET, url, None).await?;
            let next = next_page(&response);
            let batch: Vec<RawCommit> = response.json().await?;
            debug!(page, fetched = batch.len(), "Listed merge request commits");
            commits.extend(batch.into_iter().map(|c| c.id));

            match next {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        commits.reverse();
        Ok(commits)
    }

    /// Resolves usernames to user IDs, skipping any that do not resolve to
    /// exactly one user.
    async fn resolve_user_ids(&self, usernames: &[String]) -> Vec<u64> {
        let mut ids = Vec::with_capacity(usernames.len());

        for username in usernames {
            let encoded: String =
                url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
            let route = format!("{}/users?username={encoded}", self.api_url);

            match self.get::<Vec<RawUser>>(route).await {
                Ok(users) if users.len() == 1 => ids.push(users[0].id),
                Ok(users) => {
                    warn!(
                        username = %username,
                        matches = users.len(),
                        "Username does not match exactly one user, skipping"
                    );
                }
                Err(e) => warn!(username = %username, error = %e, "Failed to resolve user"),
            }
        }

        ids
    }

    async fn update_merge_request(&self, mr_route: &str, body: Value, what: &str) {
        match self
            .send::<Value>(Method::PUT, mr_route.to_string(), Some(&body))
            .await
        {
            Ok(_) => debug!(update = what, "Merge request updated"),
            Err(e) => warn!(update = what, error = %e, "Failed to update merge request"),
        }
    }

    /// Applies labels, reviewers, assignees and comments to a created merge
    /// request. Failures are logged and never propagated.
    async fn decorate_merge_request(&self, project_id: u64, iid: u64, request: &BackportRequest) {
        let mr_route = format!(
            "{}/merge_requests/{iid}",
            self.project_route(&project_id.to_string())
        );

        if !request.labels.is_empty() {
            let body = json!({ "labels": request.labels.join(",") });
            self.update_merge_request(&mr_route, body, "labels").await;
        }

        if !request.reviewers.is_empty() {
            let ids = self.resolve_user_ids(&request.reviewers).await;
            if !ids.is_empty() {
                let body = json!({ "reviewer_ids": ids });
                self.update_merge_request(&mr_route, body, "reviewers").await;
            }
        }

        if !request.assignees.is_empty() {
            let ids = self.resolve_user_ids(&request.assignees).await;
            if !ids.is_empty() {
                let body = json!({ "assignee_ids": ids });
                self.update_merge_request(&mr_route, body, "assignees").await;
            }
        }

        for comment in &request.comments {
            let url = format!("{mr_route}/notes");
            if let Err(e) = self
                .send::<RawNote>(Method::POST, url, Some(&json!({ "body": comment })))
                .await
            {
                warn!(error = %e, "Failed to post comment");
            }
        }
    }

    async fn post_note(
        &self,
        coords: &PullRequestCoordinates,
        comment: &str,
    ) -> Result<u64, ClientError> {
        let url = format!(
            "{}/merge_requests/{}/notes",
            self.project_route(&coords.project_path()),
            coords.number
        );
        let note: RawNote = self
            .send(Method::POST, url, Some(&json!({ "body": comment })))
            .await?;
        Ok(note.id)
    }
}

/// Next page number announced by a paginated response.
fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

impl GitClient for GitLabClient {
    fn client_type(&self) -> GitClientType {
        GitClientType::GitLab
    }

    async fn get_pull_request(
        &self,
        namespace: &str,
        repo: &str,
        iid: u64,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        let project = if namespace.is_empty() {
            repo.to_string()
        } else {
            format!("{namespace}/{repo}")
        };
        debug!(project = %project, iid, ?squash, "Fetching merge request");

        let url = format!("{}/merge_requests/{iid}", self.project_route(&project));
        let raw: RawMergeRequest = self.get(url).await?;

        let squash = match squash {
            Some(squash) => squash,
            None => self.infer_squash(&project, &raw).await?,
        };

        let commits = if squash {
            vec![squash_commit_sha(&raw)?]
        } else {
            self.list_commits(&project, iid).await?
        };

        let target = self.get_project(&raw.target_project_id.to_string()).await?;
        let source = if raw.source_project_id == raw.target_project_id {
            target.clone()
        } else {
            self.get_project(&raw.source_project_id.to_string()).await?
        };

        map_merge_request(raw, &self.api_url, &source, &target, commits)
    }

    async fn get_pull_request_from_url(
        &self,
        url: &str,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        let coords = parse_gitlab_url(url)?;
        self.get_pull_request(&coords.owner, &coords.project, coords.number, squash)
            .await
    }

    async fn create_pull_request(&self, request: &BackportRequest) -> Result<String, ClientError> {
        let span = info_span!(
            "create_merge_request",
            project = %format!("{}/{}", request.owner, request.repo),
            head = %request.head,
            base = %request.base
        );

        async {
            info!("Creating backport merge request");

            let project_id = self.get_project_id(&request.owner, &request.repo).await?;
            let url = format!(
                "{}/merge_requests",
                self.project_route(&project_id.to_string())
            );
            let body = json!({
                "source_branch": request.head,
                "target_branch": request.base,
                "title": request.title,
                "description": request.body,
            });
            let created: RawMergeRequest = self.send(Method::POST, url, Some(&body)).await?;

            info!(mr_iid = created.iid, url = %created.web_url, "Merge request created");
            self.decorate_merge_request(project_id, created.iid, request)
                .await;

            Ok(created.web_url)
        }
        .instrument(span)
        .await
    }

    async fn create_pull_request_comment(&self, url: &str, comment: &str) -> Option<String> {
        let result = match parse_gitlab_url(url) {
            Ok(coords) => self.post_note(&coords, comment).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(note_id) => {
                let note_url = format!("{url}#note_{note_id}");
                info!(url = %note_url, "Comment posted");
                Some(note_url)
            }
            Err(e) => {
                error!(mr = %url, error = %e, "Failed to post comment");
                None
            }
        }
    }
}
