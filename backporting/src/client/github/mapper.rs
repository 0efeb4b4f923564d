//! Mapping of GitHub-compatible REST payloads into [`PullRequest`].
//!
//! Codeberg (Forgejo) serves the same shape but reports empty collections as
//! `null`, so every list is optional here.

use crate::client::{ClientError, GitRepository, PullRequest, PullRequestState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRepository {
    pub name: String,
    pub owner: RawUser,
    pub clone_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBranch {
    pub sha: String,
    #[serde(default)]
    pub repo: Option<RawRepository>,
}

/// Pull request as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPullRequest {
    pub number: u64,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub merged_by: Option<RawUser>,
    #[serde(default)]
    pub requested_reviewers: Option<Vec<RawUser>>,
    #[serde(default)]
    pub assignees: Option<Vec<RawUser>>,
    #[serde(default)]
    pub labels: Option<Vec<RawLabel>>,
    pub head: RawBranch,
    pub base: RawBranch,
    #[serde(default)]
    pub commits: Option<u64>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

impl RawPullRequest {
    pub(crate) fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// Commit as returned by the commit and pull request commit endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCommit {
    pub sha: String,
    #[serde(default)]
    pub parents: Option<Vec<serde_json::Value>>,
}

impl RawCommit {
    pub(crate) fn parent_count(&self) -> usize {
        self.parents.as_ref().map_or(0, Vec::len)
    }
}

/// Minimal response of a create call (pull request or comment).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCreated {
    #[serde(default)]
    pub number: Option<u64>,
    pub html_url: String,
}

/// Selects the single commit to cherry-pick in squash mode.
///
/// Open pull requests use the head commit, everything else the merge (or
/// squash) commit.
pub(crate) fn squash_commit_sha(raw: &RawPullRequest) -> Result<String, ClientError> {
    let sha = if raw.is_open() {
        Some(raw.head.sha.clone()).filter(|sha| !sha.is_empty())
    } else {
        raw.merge_commit_sha.clone().filter(|sha| !sha.is_empty())
    };
    sha.ok_or(ClientError::MissingCommitSha { number: raw.number })
}

/// Maps a raw pull request into the canonical shape.
///
/// A missing head repository (deleted fork) falls back to the base repository.
pub(crate) fn map_pull_request(
    raw: RawPullRequest,
    commits: Vec<String>,
) -> Result<PullRequest, ClientError> {
    if commits.is_empty() {
        return Err(ClientError::MissingCommitSha { number: raw.number });
    }

    let target_repo = raw
        .base
        .repo
        .as_ref()
        .map(map_repository)
        .ok_or(ClientError::MissingField {
            field: "base.repo",
            context: "pull request",
        })?;
    let source_repo = raw
        .head
        .repo
        .as_ref()
        .map(map_repository)
        .unwrap_or_else(|| target_repo.clone());

    let state = match (raw.state.as_str(), raw.merged) {
        (_, true) => PullRequestState::Merged,
        ("open", false) => PullRequestState::Open,
        ("locked", false) => PullRequestState::Locked,
        _ => PullRequestState::Closed,
    };

    Ok(PullRequest {
        number: raw.number,
        author: raw.user.map(|u| u.login).unwrap_or_default(),
        url: raw.url,
        html_url: raw.html_url,
        title: raw.title,
        body: raw.body.unwrap_or_default(),
        state,
        merged: raw.merged,
        merged_by: raw.merged_by.map(|u| u.login),
        reviewers: logins(raw.requested_reviewers),
        assignees: logins(raw.assignees),
        labels: raw
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.name)
            .collect(),
        source_repo,
        target_repo,
        commit_count: raw.commits.unwrap_or(commits.len() as u64),
        commits,
    })
}

fn map_repository(repo: &RawRepository) -> GitRepository {
    GitRepository {
        owner: repo.owner.login.clone(),
        project: repo.name.clone(),
        clone_url: repo.clone_url.clone(),
    }
}

fn logins(users: Option<Vec<RawUser>>) -> Vec<String> {
    users
        .unwrap_or_default()
        .into_iter()
        .map(|u| u.login)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_pull_request(state: &str, merged: bool) -> RawPullRequest {
        let merged_by = if merged {
            json!({ "login": "that-s-a-user" })
        } else {
            json!(null)
        };
        serde_json::from_value(json!({
            "number": 2368,
            "user": { "login": "gh-user" },
            "url": "https://api.github.com/repos/owner/reponame/pulls/2368",
            "html_url": "https://github.com/owner/reponame/pull/2368",
            "title": "PR Title",
            "body": "Please review and merge",
            "state": state,
            "merged": merged,
            "merged_by": merged_by,
            "requested_reviewers": [{ "login": "requested-gh-user" }],
            "assignees": null,
            "labels": [{ "name": "backport prod" }],
            "head": {
                "sha": "91748965051fae1330ad58d15cf694e103267c87",
                "repo": {
                    "name": "reponame",
                    "owner": { "login": "fork" },
                    "clone_url": "https://github.com/fork/reponame.git"
                }
            },
            "base": {
                "sha": "c85b8fcdb741814b3e90e6e5729455cf46ff26ea",
                "repo": {
                    "name": "reponame",
                    "owner": { "login": "owner" },
                    "clone_url": "https://github.com/owner/reponame.git"
                }
            },
            "commits": 2,
            "merge_commit_sha": "28f63db774185f4ec4b57cd9aaeb12dbfb4c9ecc"
        }))
        .unwrap()
    }

    #[test]
    fn maps_merged_pull_request() {
        let raw = raw_pull_request("closed", true);
        let pr = map_pull_request(raw, vec!["28f63db".to_string()]).unwrap();

        assert_eq!(pr.number, 2368);
        assert_eq!(pr.author, "gh-user");
        assert_eq!(pr.state, PullRequestState::Merged);
        assert_eq!(pr.merged_by.as_deref(), Some("that-s-a-user"));
        assert_eq!(pr.reviewers, vec!["requested-gh-user"]);
        assert!(pr.assignees.is_empty());
        assert_eq!(pr.labels, vec!["backport prod"]);
        assert_eq!(pr.source_repo.owner, "fork");
        assert_eq!(pr.target_repo.owner, "owner");
        assert_eq!(pr.target_repo.clone_url, "https://github.com/owner/reponame.git");
        assert_eq!(pr.commit_count, 2);
    }

    #[test]
    fn maps_closed_unmerged_state() {
        let pr = map_pull_request(raw_pull_request("closed", false), vec!["a".into()]).unwrap();
        assert_eq!(pr.state, PullRequestState::Closed);
        assert!(pr.merged_by.is_none());
    }

    #[test]
    fn falls_back_to_base_repo_for_deleted_fork() {
        let mut raw = raw_pull_request("open", false);
        raw.head.repo = None;
        let pr = map_pull_request(raw, vec!["a".into()]).unwrap();
        assert_eq!(pr.source_repo, pr.target_repo);
    }

    #[test]
    fn selects_squash_sha_by_state() {
        assert_eq!(
            squash_commit_sha(&raw_pull_request("open", false)).unwrap(),
            "91748965051fae1330ad58d15cf694e103267c87"
        );
        assert_eq!(
            squash_commit_sha(&raw_pull_request("closed", true)).unwrap(),
            "28f63db774185f4ec4b57cd9aaeb12dbfb4c9ecc"
        );

        let mut raw = raw_pull_request("closed", true);
        raw.merge_commit_sha = None;
        assert!(matches!(
            squash_commit_sha(&raw),
            Err(ClientError::MissingCommitSha { number: 2368 })
        ));
    }

    #[test]
    fn rejects_empty_commit_list() {
        let result = map_pull_request(raw_pull_request("open", false), Vec::new());
        assert!(matches!(result, Err(ClientError::MissingCommitSha { .. })));
    }
}
