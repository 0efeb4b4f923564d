#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod args;
pub mod client;
pub mod config;
pub mod git;
pub mod runner;
pub mod summary;
pub mod templates;

pub use args::{resolve_auth, Args, ArgsError};
pub use client::{
    build_git_client, infer_git_api_url, infer_git_client, BackportRequest, ClientError,
    GitClient, GitClientType, GitRepository, HostClient, PullRequest, PullRequestState,
};
pub use config::{parse_and_validate, ConfigError, Configuration, ErrorNotification};
pub use git::{CherryPickOptions, GitCli, GitCliRunner, GitError};
pub use runner::{run, BackportError, BackportFailures, Runner, RunnerError};
pub use summary::{BackportOutcome, RunSummary};
pub use templates::{NotificationRenderer, TemplateError};
