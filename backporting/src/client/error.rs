//! Git host client error types.

use thiserror::Error;

/// Errors that can occur while talking to a git hosting service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// GitHub-compatible API error.
    #[error("GitHub API error: {0}")]
    GitHubError(#[from] octocrab::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success response from a REST API.
    #[error("{method} {url} failed with status {status}: {message}")]
    ApiError {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    /// The URL does not belong to a supported git host.
    #[error("Git client type not supported or not inferred for {url}")]
    UnsupportedHost { url: String },

    /// The URL could not be parsed as a pull/merge request URL.
    #[error("Invalid pull request URL '{url}': {message}")]
    InvalidPullRequestUrl { url: String, message: String },

    /// The API base URL is not an absolute URL.
    #[error("Invalid API URL '{url}': {message}")]
    InvalidApiUrl { url: String, message: String },

    /// Fewer commits were listed than the pull request reports.
    #[error("Pull request #{number} has {expected} commits but only {fetched} could be listed")]
    IncompleteCommitList {
        number: u64,
        expected: u64,
        fetched: u64,
    },

    /// The pull request has no commit that can be cherry-picked.
    #[error("Pull request #{number} has no usable commit SHA to backport")]
    MissingCommitSha { number: u64 },

    /// A required field was absent from an API payload.
    #[error("Missing field '{field}' in {context} response")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },
}
