//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while resolving the backport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The arguments are incomplete.
    #[error(transparent)]
    Args(#[from] crate::args::ArgsError),

    /// The original pull request could not be fetched.
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    /// The original pull request can not be backported.
    #[error("Provided pull request is closed and not merged")]
    ClosedNotMerged { url: String },

    /// The target branch pattern is not a valid regex.
    #[error("Invalid target branch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The target branch pattern matched no label.
    #[error("Unable to extract target branches with regular expression '{pattern}'")]
    NoTargetBranches { pattern: String },

    /// No target branch survived parsing.
    #[error("No target branch provided")]
    EmptyTargetBranches,

    /// Custom branch names do not line up with the target branches.
    #[error(
        "The number of backport branch names, if provided, must match the number of target branches or just one, provided {provided} branch names instead"
    )]
    BranchNameCount { provided: usize },

    /// A backport branch name is not a valid git reference.
    #[error("Invalid backport branch name '{name}': {message}")]
    InvalidBranchName { name: String, message: String },

    /// Two targets resolved to the same backport branch.
    #[error("Backport branch name '{name}' is used for more than one target branch")]
    DuplicateBranchName { name: String },

    /// The error notification template does not compile.
    #[error("Invalid error notification message: {0}")]
    Template(#[from] crate::templates::TemplateError),

    /// The default working folder could not be determined.
    #[error("Failed to resolve the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}
