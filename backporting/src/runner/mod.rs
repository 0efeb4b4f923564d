//! Orchestrates the backport of a pull request to its target branches.
//!
//! Each target runs the full clone, branch, fetch, cherry-pick, push and
//! create pipeline on its own. Targets are processed one after the other; a
//! failing target never stops the next one and all failures are reported
//! together once every target was attempted.

mod error;

pub use error::{BackportError, BackportFailures, RunnerError};

use crate::args::{resolve_auth, Args};
use crate::client::{
    build_git_client, default_api_version, infer_git_api_url, infer_git_client, BackportRequest,
    GitClient, GitClientType,
};
use crate::config::{parse_and_validate, ConfigError, Configuration};
use crate::git::{GitCli, GitCliRunner};
use crate::summary::{BackportOutcome, RunSummary};
use crate::templates::{NotificationContext, NotificationRenderer};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};

/// Remote every working directory is cloned from.
pub const REMOTE: &str = "origin";

/// Runs the backport pipeline over a resolved [`Configuration`].
#[derive(Debug)]
pub struct Runner<C, G> {
    client: C,
    git: G,
}

impl<C: GitClient, G: GitCli> Runner<C, G> {
    /// Creates a runner talking to the host through `client` and running
    /// local operations through `git`.
    pub fn new(client: C, git: G) -> Self {
        Self { client, git }
    }

    /// Returns the host client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the git runner.
    pub fn git(&self) -> &G {
        &self.git
    }

    /// Backports to every target branch of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Backport`] listing every failed target once
    /// all targets were attempted. It carries the outcomes of the whole run.
    pub async fn execute(&self, config: &Configuration) -> Result<RunSummary, RunnerError> {
        let renderer = NotificationRenderer::new(&config.error_notification.message)?;
        let mut summary = RunSummary::new(config.dry_run);
        let mut failures = BackportFailures::default();

        info!(
            pull_request = %config.original_pull_request.html_url,
            targets = config.backport_requests.len(),
            dry_run = config.dry_run,
            "Starting backport"
        );

        for request in &config.backport_requests {
            let span = info_span!("backport", target_branch = %request.base);

            let result = async {
                let result = self.backport(config, request).await;
                if let Err(e) = &result {
                    error!(error = %e, "Backport failed");
                    if config.error_notification.enabled {
                        self.notify_failure(config, &renderer, &request.base).await;
                    }
                }
                result
            }
            .instrument(span)
            .await;

            match result {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    summary.record(BackportOutcome::Failed {
                        target_branch: request.base.clone(),
                        error: e.to_string(),
                    });
                    failures.push(request.base.clone(), e);
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                created = summary.created(),
                failed = summary.failed(),
                "Backport finished with failures"
            );
            return Err(failures.with_summary(summary).into());
        }

        info!(created = summary.created(), "Backport completed");
        Ok(summary)
    }

    /// Runs the pipeline for a single target branch.
    async fn backport(
        &self,
        config: &Configuration,
        request: &BackportRequest,
    ) -> Result<BackportOutcome, BackportError> {
        let original = &config.original_pull_request;
        let cwd = working_directory(&config.folder, &request.base);

        self.git
            .clone_repository(&original.target_repo.clone_url, &cwd, &request.base)
            .await?;
        self.git.create_local_branch(&cwd, &request.head).await?;

        // Commits of forks and open requests are not reachable from the target.
        if needs_remote_ref(config) {
            let refspec = remote_refspec(self.client.client_type(), original.number);
            self.git.fetch(&cwd, &refspec, REMOTE).await?;
        }

        for sha in &original.commits {
            self.git.cherry_pick(&cwd, sha, &config.cherry_pick).await?;
        }

        if config.dry_run {
            info!(
                head = %request.head,
                base = %request.base,
                title = %request.title,
                reviewers = ?request.reviewers,
                assignees = ?request.assignees,
                labels = ?request.labels,
                "Dry run, skipping push and pull request creation"
            );
            return Ok(BackportOutcome::DryRun {
                target_branch: request.base.clone(),
                head: request.head.clone(),
            });
        }

        self.git.push(&cwd, &request.head, REMOTE, false).await?;
        let url = self.client.create_pull_request(request).await?;
        info!(url = %url, "Backport pull request created");

        Ok(BackportOutcome::Created {
            target_branch: request.base.clone(),
            url,
        })
    }

    /// Comments on the original pull request about a failed target.
    async fn notify_failure(
        &self,
        config: &Configuration,
        renderer: &NotificationRenderer,
        target_branch: &str,
    ) {
        let original = &config.original_pull_request;
        let context = NotificationContext {
            target_branch,
            pull_request_url: &original.html_url,
        };

        match renderer.render(&context) {
            Ok(message) => {
                self.client
                    .create_pull_request_comment(&original.html_url, &message)
                    .await;
            }
            Err(e) => warn!(error = %e, "Failed to render error notification"),
        }
    }
}

/// Per-target working directory under `folder`.
#[must_use]
pub fn working_directory(folder: &Path, target_branch: &str) -> PathBuf {
    folder.join(target_branch.replace('/', "-"))
}

/// Refspec fetching the head of pull request `number` into `pr/<number>`.
#[must_use]
pub fn remote_refspec(client_type: GitClientType, number: u64) -> String {
    match client_type {
        GitClientType::GitLab => format!("merge-requests/{number}/head:pr/{number}"),
        GitClientType::GitHub | GitClientType::Codeberg => {
            format!("pull/{number}/head:pr/{number}")
        }
    }
}

fn needs_remote_ref(config: &Configuration) -> bool {
    let original = &config.original_pull_request;
    original.source_repo.owner != original.target_repo.owner
        || original.state == crate::client::PullRequestState::Open
}

/// Resolves the host, configuration and credentials for `args` and runs the
/// backport.
///
/// # Errors
///
/// Returns [`RunnerError`] on invalid arguments, an unsupported host, a pull
/// request that cannot be backported, or failed targets.
pub async fn run(mut args: Args) -> Result<RunSummary, RunnerError> {
    args.validate().map_err(ConfigError::from)?;

    let client_type = match args.git_client {
        Some(client_type) => client_type,
        None => infer_git_client(&args.pull_request)?,
    };
    let api_url = infer_git_api_url(&args.pull_request, default_api_version(client_type))?;

    args.auth = resolve_auth(args.auth.as_deref(), client_type);
    if args.auth.is_none() {
        warn!(client = %client_type, "No auth token found, requests are anonymous");
    }

    let client = build_git_client(client_type, &api_url, args.auth.as_deref())?;
    let config = parse_and_validate(&args, &client).await?;

    let git = GitCliRunner::new(
        config.auth.clone(),
        config.git_user.clone(),
        config.git_email.clone(),
    );
    Runner::new(client, git).execute(&config).await
}
