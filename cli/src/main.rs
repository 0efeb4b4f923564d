//! CLI for backporting.
//!
//! Backports a pull request or merge request to one or more target branches
//! on GitHub, GitLab or Codeberg.

use backporting::{Args, BackportOutcome, GitClientType, RunSummary, RunnerError};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Backport a pull request to one or more target branches.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file. When given, every other option is ignored.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Pull or merge request URL to backport.
    #[arg(short = 'p', long)]
    pull_request: Option<String>,

    /// Comma separated target branches.
    #[arg(short = 'b', long)]
    target_branch: Option<String>,

    /// Regex with a `target` named group extracting target branches from labels.
    #[arg(long)]
    target_branch_pattern: Option<String>,

    /// Cherry-pick locally without pushing or creating pull requests.
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Auth token. Falls back to the host token variable, then GIT_TOKEN.
    #[arg(short = 'a', long)]
    auth: Option<String>,

    /// Host type, inferred from the pull request URL by default.
    #[arg(long)]
    git_client: Option<GitClientType>,

    /// Name of the local committer.
    #[arg(long)]
    git_user: Option<String>,

    /// Email of the local committer.
    #[arg(long)]
    git_email: Option<String>,

    /// Root folder of the local clones [default: ./bp].
    #[arg(short = 'f', long)]
    folder: Option<PathBuf>,

    /// Title of the backport pull requests.
    #[arg(long)]
    title: Option<String>,

    /// Body of the backport pull requests.
    #[arg(long)]
    body: Option<String>,

    /// Prefix of the backport pull request body.
    #[arg(long)]
    body_prefix: Option<String>,

    /// Comma separated backport branch names.
    #[arg(long)]
    bp_branch_name: Option<String>,

    /// Comma separated reviewers.
    #[arg(long, value_delimiter = ',')]
    reviewers: Vec<String>,

    /// Comma separated assignees.
    #[arg(long, value_delimiter = ',')]
    assignees: Vec<String>,

    /// Do not request reviews from the original author and merger.
    #[arg(long)]
    no_inherit_reviewers: bool,

    /// Comma separated labels.
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Copy the labels of the original pull request.
    #[arg(long)]
    inherit_labels: bool,

    /// Backport every commit instead of the single squashed one.
    #[arg(long)]
    no_squash: bool,

    /// Decide squash mode from the merge commit.
    #[arg(long, conflicts_with = "no_squash")]
    auto_no_squash: bool,

    /// Cherry-pick merge strategy.
    #[arg(long, default_value = "recursive")]
    strategy: String,

    /// Cherry-pick merge strategy option.
    #[arg(long, default_value = "theirs")]
    strategy_option: String,

    /// Extra `git cherry-pick` flags, whitespace separated.
    #[arg(long, allow_hyphen_values = true)]
    cherry_pick_options: Option<String>,

    /// Comments posted on the backport pull requests.
    #[arg(long)]
    comments: Vec<String>,

    /// Comment on the original pull request when a backport fails.
    #[arg(long)]
    enable_err_notification: bool,

    /// Template of the failure comment (Handlebars, `{{target_branch}}`).
    #[arg(long)]
    error_notification_message: Option<String>,
}

impl From<Cli> for Args {
    fn from(cli: Cli) -> Self {
        Self {
            pull_request: cli.pull_request.unwrap_or_default(),
            target_branch: cli.target_branch,
            target_branch_pattern: cli.target_branch_pattern,
            dry_run: cli.dry_run,
            auth: cli.auth,
            git_client: cli.git_client,
            git_user: cli.git_user,
            git_email: cli.git_email,
            folder: cli.folder,
            title: cli.title,
            body: cli.body,
            body_prefix: cli.body_prefix,
            bp_branch_name: cli.bp_branch_name,
            reviewers: cli.reviewers,
            assignees: cli.assignees,
            inherit_reviewers: !cli.no_inherit_reviewers,
            labels: cli.labels,
            inherit_labels: cli.inherit_labels,
            squash: !cli.no_squash,
            auto_no_squash: cli.auto_no_squash,
            strategy: Some(cli.strategy),
            strategy_option: Some(cli.strategy_option),
            cherry_pick_options: cli.cherry_pick_options,
            comments: cli.comments,
            enable_err_notification: cli.enable_err_notification,
            error_notification_message: cli.error_notification_message,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    init_tracing();

    let cli = Cli::parse();

    let args = match cli.config_file.clone() {
        Some(path) => match Args::from_config_file(&path) {
            Ok(args) => args,
            Err(e) => {
                error!(error = %e, "Invalid config file");
                return ExitCode::FAILURE;
            }
        },
        None => Args::from(cli),
    };

    match backporting::run(args).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let RunnerError::Backport(failures) = &e {
                print_summary(failures.summary());
            }
            error!(error = %e, "Backport failed");
            ExitCode::FAILURE
        }
    }
}

/// Initializes tracing with compact output and `RUST_LOG` filtering,
/// defaulting to `info`.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );

    for outcome in &summary.outcomes {
        match outcome {
            BackportOutcome::Created { target_branch, url } => {
                println!("  {target_branch}: created {url}");
            }
            BackportOutcome::DryRun {
                target_branch,
                head,
            } => println!("  {target_branch}: prepared {head}"),
            BackportOutcome::Failed {
                target_branch,
                error,
            } => println!("  {target_branch}: failed, {error}"),
        }
    }
}
