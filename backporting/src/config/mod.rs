//! Backport configuration.
//!
//! [`parse_and_validate`] combines the user [`Args`] with the original pull
//! request fetched from the host into an immutable [`Configuration`] holding
//! one [`BackportRequest`] per target branch.

mod branches;
mod error;

pub use branches::{
    backport_branch_names, extract_target_branches, resolve_target_branches, split_list,
    truncate_branch_name, validate_branch_name, MAX_BRANCH_NAME_LENGTH,
};
pub use error::ConfigError;

use crate::args::Args;
use crate::client::{BackportRequest, GitClient, PullRequest, PullRequestState};
use crate::git::CherryPickOptions;
use crate::templates::{NotificationRenderer, DEFAULT_ERROR_NOTIFICATION};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Folder created under the current directory when none is configured.
pub const DEFAULT_FOLDER: &str = "bp";

/// Comment posted on the original pull request when a backport fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotification {
    pub enabled: bool,
    /// Handlebars template, see [`crate::templates::NotificationContext`].
    pub message: String,
}

/// Fully resolved backport configuration.
#[derive(Clone)]
pub struct Configuration {
    pub dry_run: bool,
    pub auth: Option<String>,
    pub git_user: String,
    pub git_email: String,
    /// Root of the per-target working directories.
    pub folder: PathBuf,
    pub cherry_pick: CherryPickOptions,
    pub error_notification: ErrorNotification,
    pub original_pull_request: PullRequest,
    /// One request per target branch, in target order.
    pub backport_requests: Vec<BackportRequest>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("dry_run", &self.dry_run)
            .field("auth", &self.auth.as_ref().map(|_| "***"))
            .field("git_user", &self.git_user)
            .field("git_email", &self.git_email)
            .field("folder", &self.folder)
            .field("cherry_pick", &self.cherry_pick)
            .field("error_notification", &self.error_notification)
            .field("original_pull_request", &self.original_pull_request.html_url)
            .field("backport_requests", &self.backport_requests)
            .finish()
    }
}

/// Resolves and validates the configuration for a run.
///
/// The original pull request is fetched through `client` with the squash
/// preference from `args`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the arguments are incomplete, the pull request
/// cannot be fetched or is closed without being merged, or the target and
/// backport branches cannot be resolved.
pub async fn parse_and_validate(
    args: &Args,
    client: &impl GitClient,
) -> Result<Configuration, ConfigError> {
    args.validate()?;

    let folder = match &args.folder {
        Some(folder) => folder.clone(),
        None => std::env::current_dir()
            .map_err(ConfigError::CurrentDir)?
            .join(DEFAULT_FOLDER),
    };

    let original = client
        .get_pull_request_from_url(&args.pull_request, args.squash_preference())
        .await?;
    validate_pull_request(&original)?;

    let targets = resolve_target_branches(
        args.target_branch.as_deref(),
        args.target_branch_pattern.as_deref(),
        &original.labels,
    )?;
    let names = backport_branch_names(args.bp_branch_name.as_deref(), &targets, &original.commits)?;
    info!(targets = ?targets, branches = ?names, "Resolved target branches");

    let backport_requests = targets
        .iter()
        .zip(names)
        .map(|(target, head)| build_backport_request(args, &original, target, head))
        .collect();

    let message = args
        .error_notification_message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_NOTIFICATION.to_string());
    NotificationRenderer::new(&message)?;

    Ok(Configuration {
        dry_run: args.dry_run,
        auth: args.auth.clone().filter(|a| !a.is_empty()),
        git_user: args
            .git_user
            .clone()
            .unwrap_or_else(|| client.default_git_user().to_string()),
        git_email: args
            .git_email
            .clone()
            .unwrap_or_else(|| client.default_git_email().to_string()),
        folder,
        cherry_pick: CherryPickOptions {
            strategy: args.strategy.clone().filter(|s| !s.is_empty()),
            strategy_option: args.strategy_option.clone().filter(|s| !s.is_empty()),
            extra_options: args
                .cherry_pick_options
                .as_deref()
                .map(|options| options.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        },
        error_notification: ErrorNotification {
            enabled: args.enable_err_notification,
            message,
        },
        original_pull_request: original,
        backport_requests,
    })
}

/// Rejects pull requests that were closed without being merged.
///
/// # Errors
///
/// Returns [`ConfigError::ClosedNotMerged`].
pub fn validate_pull_request(pr: &PullRequest) -> Result<(), ConfigError> {
    match pr.state {
        PullRequestState::Open => {
            warn!(url = %pr.html_url, "Backporting a pull request that is still open");
            Ok(())
        }
        PullRequestState::Merged => Ok(()),
        _ if pr.merged => Ok(()),
        _ => Err(ConfigError::ClosedNotMerged {
            url: pr.html_url.clone(),
        }),
    }
}

/// Builds the backport request for one target branch.
#[must_use]
pub fn build_backport_request(
    args: &Args,
    original: &PullRequest,
    target: &str,
    head: String,
) -> BackportRequest {
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| format!("[{target}] {}", original.title));

    let prefix = args
        .body_prefix
        .clone()
        .unwrap_or_else(|| format!("**Backport:** {}\r\n\r\n", original.html_url));
    let body = args.body.as_deref().unwrap_or(&original.body);
    let body = unescape_newlines(&format!("{prefix}{body}"));

    let mut reviewers = args.reviewers.clone();
    if reviewers.is_empty() && args.inherit_reviewers {
        reviewers.push(original.author.clone());
        reviewers.extend(original.merged_by.clone());
    }

    let mut labels = args.labels.clone();
    if args.inherit_labels {
        labels.extend(original.labels.iter().cloned());
    }

    let request = BackportRequest {
        owner: original.target_repo.owner.clone(),
        repo: original.target_repo.project.clone(),
        head,
        base: target.to_string(),
        title,
        body,
        reviewers: dedup(reviewers),
        assignees: dedup(args.assignees.clone()),
        labels: dedup(labels),
        comments: args.comments.clone(),
    };
    debug!(head = %request.head, base = %request.base, "Built backport request");
    request
}

/// Turns literal `\n` and `\r` sequences into real line breaks.
fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\r", "\r")
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !value.is_empty() && !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
