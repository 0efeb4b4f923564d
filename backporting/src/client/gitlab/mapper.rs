//! Mapping of GitLab REST payloads into [`PullRequest`].

use crate::client::{ClientError, GitRepository, PullRequest, PullRequestState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUser {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNamespace {
    pub full_path: String,
}

/// Project as returned by `GET /projects/:id`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawProject {
    pub id: u64,
    pub path: String,
    pub namespace: RawNamespace,
    pub http_url_to_repo: String,
}

/// Merge request as returned by `GET /projects/:id/merge_requests/:iid`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMergeRequest {
    pub iid: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub author: Option<RawUser>,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub merge_user: Option<RawUser>,
    #[serde(default)]
    pub merged_by: Option<RawUser>,
    #[serde(default)]
    pub reviewers: Option<Vec<RawUser>>,
    #[serde(default)]
    pub assignees: Option<Vec<RawUser>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    pub source_project_id: u64,
    pub target_project_id: u64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub squash_commit_sha: Option<String>,
}

impl RawMergeRequest {
    pub(crate) fn is_open(&self) -> bool {
        self.state == "opened"
    }

    pub(crate) fn is_merged(&self) -> bool {
        self.state == "merged"
    }
}

/// Commit as returned by the repository and merge request commit endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCommit {
    pub id: String,
    #[serde(default)]
    pub parent_ids: Option<Vec<String>>,
}

/// A created note (comment).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNote {
    pub id: u64,
}

/// Selects the single commit to cherry-pick in squash mode.
///
/// Merged requests prefer the squash commit over the merge commit; open and
/// closed requests use their head `sha`.
pub(crate) fn squash_commit_sha(raw: &RawMergeRequest) -> Result<String, ClientError> {
    let sha = if raw.is_merged() {
        non_empty(&raw.squash_commit_sha).or_else(|| non_empty(&raw.merge_commit_sha))
    } else {
        non_empty(&raw.sha)
    };
    sha.ok_or(ClientError::MissingCommitSha { number: raw.iid })
}

/// Maps a raw merge request and its projects into the canonical shape.
pub(crate) fn map_merge_request(
    raw: RawMergeRequest,
    api_url: &str,
    source: &RawProject,
    target: &RawProject,
    commits: Vec<String>,
) -> Result<PullRequest, ClientError> {
    if commits.is_empty() {
        return Err(ClientError::MissingCommitSha { number: raw.iid });
    }

    let state = match raw.state.as_str() {
        "opened" => PullRequestState::Open,
        "merged" => PullRequestState::Merged,
        "locked" => PullRequestState::Locked,
        _ => PullRequestState::Closed,
    };
    let merged = state == PullRequestState::Merged;

    Ok(PullRequest {
        number: raw.iid,
        author: raw.author.map(|u| u.username).unwrap_or_default(),
        url: format!(
            "{api_url}/projects/{}/merge_requests/{}",
            raw.project_id.unwrap_or(target.id),
            raw.iid
        ),
        html_url: raw.web_url,
        title: raw.title,
        body: raw.description.unwrap_or_default(),
        state,
        merged,
        merged_by: raw.merge_user.or(raw.merged_by).map(|u| u.username),
        reviewers: usernames(raw.reviewers),
        assignees: usernames(raw.assignees),
        labels: raw.labels.unwrap_or_default(),
        source_repo: map_project(source),
        target_repo: map_project(target),
        // The merge request payload carries no commit count.
        commit_count: commits.len() as u64,
        commits,
    })
}

fn map_project(project: &RawProject) -> GitRepository {
    GitRepository {
        owner: project.namespace.full_path.clone(),
        project: project.path.clone(),
        clone_url: project.http_url_to_repo.clone(),
    }
}

fn usernames(users: Option<Vec<RawUser>>) -> Vec<String> {
    users
        .unwrap_or_default()
        .into_iter()
        .map(|u| u.username)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}
