//! User supplied options, as produced by the CLI or a JSON config file.

mod error;

pub use error::ArgsError;

use crate::client::GitClientType;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Generic token fallback consulted after the host specific one.
pub const GIT_TOKEN_ENV: &str = "GIT_TOKEN";

/// Normalized backport arguments.
///
/// Field names follow the camelCase keys of the JSON config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Args {
    /// Pull or merge request URL to backport.
    pub pull_request: String,
    /// Comma separated target branches.
    pub target_branch: Option<String>,
    /// Regex with a `target` named group, applied to the request labels.
    pub target_branch_pattern: Option<String>,
    pub dry_run: bool,
    pub auth: Option<String>,
    /// Host type, inferred from [`Args::pull_request`] when absent.
    pub git_client: Option<GitClientType>,
    pub git_user: Option<String>,
    pub git_email: Option<String>,
    /// Root folder for the per-target clones.
    pub folder: Option<PathBuf>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub body_prefix: Option<String>,
    /// Comma separated backport branch names.
    pub bp_branch_name: Option<String>,
    pub reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub inherit_reviewers: bool,
    pub labels: Vec<String>,
    pub inherit_labels: bool,
    pub squash: bool,
    pub auto_no_squash: bool,
    pub strategy: Option<String>,
    pub strategy_option: Option<String>,
    /// Whitespace separated extra `git cherry-pick` flags.
    pub cherry_pick_options: Option<String>,
    pub comments: Vec<String>,
    pub enable_err_notification: bool,
    /// Handlebars template for the failure comment.
    pub error_notification_message: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            pull_request: String::new(),
            target_branch: None,
            target_branch_pattern: None,
            dry_run: false,
            auth: None,
            git_client: None,
            git_user: None,
            git_email: None,
            folder: None,
            title: None,
            body: None,
            body_prefix: None,
            bp_branch_name: None,
            reviewers: Vec::new(),
            assignees: Vec::new(),
            inherit_reviewers: true,
            labels: Vec::new(),
            inherit_labels: false,
            squash: true,
            auto_no_squash: false,
            strategy: Some("recursive".to_string()),
            strategy_option: Some("theirs".to_string()),
            cherry_pick_options: None,
            comments: Vec::new(),
            enable_err_notification: false,
            error_notification_message: None,
        }
    }
}

impl Args {
    /// Loads arguments from a JSON config file.
    ///
    /// Keys missing from the file take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError`] if the file cannot be read or parsed.
    pub fn from_config_file(path: &Path) -> Result<Self, ArgsError> {
        debug!(path = %path.display(), "Reading config file");

        let content = std::fs::read_to_string(path).map_err(|source| ArgsError::IoError {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ArgsError::JsonError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Checks that the mandatory options are present.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError`] naming the first missing option.
    pub fn validate(&self) -> Result<(), ArgsError> {
        if self.pull_request.trim().is_empty() {
            return Err(ArgsError::MissingPullRequest);
        }
        if is_blank(&self.target_branch) && is_blank(&self.target_branch_pattern) {
            return Err(ArgsError::MissingTargetBranch);
        }
        Ok(())
    }

    /// Squash mode to request from the host, `None` meaning infer it.
    #[must_use]
    pub fn squash_preference(&self) -> Option<bool> {
        if self.auto_no_squash {
            None
        } else {
            Some(self.squash)
        }
    }
}

/// Picks the auth token for a host.
///
/// An explicit token wins, then the host specific environment variable, then
/// [`GIT_TOKEN_ENV`]. Empty values are ignored.
#[must_use]
pub fn resolve_auth(explicit: Option<&str>, client_type: GitClientType) -> Option<String> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    [token_env_var(client_type), GIT_TOKEN_ENV]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()))
}

/// Host specific token environment variable.
#[must_use]
pub fn token_env_var(client_type: GitClientType) -> &'static str {
    match client_type {
        GitClientType::GitHub => "GITHUB_TOKEN",
        GitClientType::GitLab => "GITLAB_TOKEN",
        GitClientType::Codeberg => "CODEBERG_TOKEN",
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
