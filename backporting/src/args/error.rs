//! Argument error types.

use thiserror::Error;

/// Errors that can occur while loading or validating arguments.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// Failed to read the config file.
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the config file.
    #[error("Failed to parse config file '{path}': {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// No pull request was provided.
    #[error("Missing option: pull request must be provided")]
    MissingPullRequest,

    /// Neither target branches nor a pattern were provided.
    #[error("Missing option: target branch(es) or target regular expression must be provided")]
    MissingTargetBranch,
}
