//! Host-agnostic pull request types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported git hosting services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitClientType {
    /// github.com and GitHub Enterprise.
    GitHub,
    /// gitlab.com and self-hosted GitLab.
    GitLab,
    /// codeberg.org (Forgejo).
    Codeberg,
}

impl GitClientType {
    /// Returns the lowercase name of the host type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Codeberg => "codeberg",
        }
    }
}

impl fmt::Display for GitClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GitClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            "codeberg" => Ok(Self::Codeberg),
            other => Err(format!(
                "unsupported git client '{other}', expected one of: github, gitlab, codeberg"
            )),
        }
    }
}

/// A repository, independent of its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRepository {
    /// Owner, or full namespace path on GitLab (e.g. `group/subgroup`).
    pub owner: String,
    /// Repository (project) name.
    pub project: String,
    /// HTTPS clone URL.
    pub clone_url: String,
}

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
    Locked,
}

/// A pull request (or merge request) normalized across hosts.
///
/// `commits` is never empty: it holds either the single SHA to cherry-pick
/// (squash mode) or the full commit list, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// Number (GitHub) or iid (GitLab).
    pub number: u64,
    /// Login of the author.
    pub author: String,
    /// API URL.
    pub url: String,
    /// Browser URL.
    pub html_url: String,
    pub title: String,
    pub body: String,
    pub state: PullRequestState,
    pub merged: bool,
    /// Login of the user who merged it, if any.
    pub merged_by: Option<String>,
    pub reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    /// Repository the changes come from (may be a fork).
    pub source_repo: GitRepository,
    /// Repository the pull request was opened against.
    pub target_repo: GitRepository,
    /// Number of commits reported by the host.
    pub commit_count: u64,
    pub commits: Vec<String>,
}

/// A backport pull request to be created on one target branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackportRequest {
    /// Owner (namespace) of the target repository.
    pub owner: String,
    /// Target repository name.
    pub repo: String,
    /// Backport branch name.
    pub head: String,
    /// Target branch.
    pub base: String,
    pub title: String,
    pub body: String,
    pub reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    /// Comments posted on the backport once created.
    pub comments: Vec<String>,
}
