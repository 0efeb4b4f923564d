//! Local git operations, delegated to the `git` executable.

mod error;

pub use error::GitError;

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// Options applied to every cherry-pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CherryPickOptions {
    /// Merge strategy (`--strategy`).
    pub strategy: Option<String>,
    /// Merge strategy option (`--strategy-option`).
    pub strategy_option: Option<String>,
    /// Additional raw `git cherry-pick` flags.
    pub extra_options: Vec<String>,
}

/// Git operations the backport pipeline runs in a working directory.
#[allow(async_fn_in_trait)]
pub trait GitCli {
    /// Clones `from` at `branch` into `to`.
    ///
    /// When `to` already holds a repository, it is reset to the tip of
    /// `branch` instead.
    async fn clone_repository(&self, from: &str, to: &Path, branch: &str) -> Result<(), GitError>;

    /// Creates and checks out a new local branch.
    async fn create_local_branch(&self, cwd: &Path, branch: &str) -> Result<(), GitError>;

    /// Fetches `remote_ref` (a refspec) from `remote`.
    async fn fetch(&self, cwd: &Path, remote_ref: &str, remote: &str) -> Result<(), GitError>;

    /// Cherry-picks a single commit onto the current branch.
    async fn cherry_pick(
        &self,
        cwd: &Path,
        sha: &str,
        options: &CherryPickOptions,
    ) -> Result<(), GitError>;

    /// Pushes `branch` to `remote`, with `--force-with-lease` when `force`.
    async fn push(&self, cwd: &Path, branch: &str, remote: &str, force: bool)
        -> Result<(), GitError>;
}

/// Runs git commands through the `git` executable on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCliRunner {
    auth: Option<String>,
    user: String,
    email: String,
}

impl GitCliRunner {
    /// Creates a runner committing as `user <email>` and authenticating
    /// remotes with `auth` when present.
    pub fn new(auth: Option<String>, user: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            auth: auth.filter(|token| !token.is_empty()),
            user: user.into(),
            email: email.into(),
        }
    }

    /// Runs a git command in `cwd`, returning its stdout.
    async fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = describe_command(args);
        debug!(command = %command, cwd = %cwd.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            // Never wait for credentials on a terminal.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GitError::SpawnFailed {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed {
                command,
                stderr: self.redact(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn redact(&self, text: &str) -> String {
        match &self.auth {
            Some(token) => text.replace(token.as_str(), "***"),
            None => text.to_string(),
        }
    }

    /// Remote URL for `origin`, carrying credentials when a token is set.
    fn origin_url(&self, from: &str) -> Result<String, GitError> {
        match &self.auth {
            Some(token) => remote_with_auth(from, &self.user, token),
            None => Ok(from.to_string()),
        }
    }

    /// Brings an existing clone back to the tip of `branch`.
    ///
    /// The clone may come from an earlier run, so `origin` and the committer
    /// identity are set again before fetching.
    async fn refresh_repository(
        &self,
        from: &str,
        to: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        info!(path = %to.display(), "Folder already exists, won't clone");

        if let Err(e) = self.run_git(to, &["cherry-pick", "--abort"]).await {
            debug!(error = %e, "No cherry-pick in progress");
        }

        let remote = self.origin_url(from)?;
        for args in refresh_args(&remote, branch, &self.user, &self.email) {
            self.run_git(to, &args).await?;
        }
        Ok(())
    }
}

impl GitCli for GitCliRunner {
    async fn clone_repository(&self, from: &str, to: &Path, branch: &str) -> Result<(), GitError> {
        if to.join(".git").exists() {
            return self.refresh_repository(from, to, branch).await;
        }

        info!(remote = %from, branch, path = %to.display(), "Cloning repository");

        let parent = to
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| GitError::IoError {
                path: parent.display().to_string(),
                source,
            })?;

        let remote = self.origin_url(from)?;
        // Relative to `parent`, the clone runs from there.
        let target = to
            .file_name()
            .map_or_else(|| to.to_string_lossy(), |name| name.to_string_lossy());
        self.run_git(
            parent,
            &[
                "clone",
                "--quiet",
                "--no-tags",
                "--branch",
                branch,
                &remote,
                &target,
            ],
        )
        .await?;

        for args in identity_args(&self.user, &self.email) {
            self.run_git(to, &args).await?;
        }
        Ok(())
    }

    async fn create_local_branch(&self, cwd: &Path, branch: &str) -> Result<(), GitError> {
        info!(branch, "Creating branch");
        self.run_git(cwd, &["checkout", "-b", branch]).await?;
        Ok(())
    }

    async fn fetch(&self, cwd: &Path, remote_ref: &str, remote: &str) -> Result<(), GitError> {
        info!(remote, remote_ref, "Fetching");
        self.run_git(cwd, &["fetch", "--quiet", remote, remote_ref])
            .await?;
        Ok(())
    }

    async fn cherry_pick(
        &self,
        cwd: &Path,
        sha: &str,
        options: &CherryPickOptions,
    ) -> Result<(), GitError> {
        info!(sha, "Cherry-picking");
        let args = cherry_pick_args(sha, options);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_git(cwd, &args).await?;
        Ok(())
    }

    async fn push(
        &self,
        cwd: &Path,
        branch: &str,
        remote: &str,
        force: bool,
    ) -> Result<(), GitError> {
        info!(branch, remote, force, "Pushing");
        let args = push_args(branch, remote, force);
        self.run_git(cwd, &args).await?;
        Ok(())
    }
}

/// Injects `user:token` credentials into an HTTP(S) remote URL.
///
/// Non-HTTP remotes (e.g. SSH) are returned unchanged.
///
/// # Errors
///
/// Returns [`GitError::InvalidRemote`] if `remote` is not a valid URL.
pub fn remote_with_auth(remote: &str, user: &str, token: &str) -> Result<String, GitError> {
    let mut url = Url::parse(remote).map_err(|e| GitError::InvalidRemote {
        url: remote.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        warn!(remote, "Not an HTTP remote, credentials not injected");
        return Ok(remote.to_string());
    }

    let invalid = |_| GitError::InvalidRemote {
        url: remote.to_string(),
        message: "cannot carry credentials".to_string(),
    };
    url.set_username(user).map_err(invalid)?;
    url.set_password(Some(token)).map_err(invalid)?;
    Ok(url.into())
}

/// Builds the `git cherry-pick` arguments for one commit.
///
/// `-m 1` lets merge commits be picked against their first parent.
#[must_use]
pub fn cherry_pick_args(sha: &str, options: &CherryPickOptions) -> Vec<String> {
    let mut args = vec!["cherry-pick".to_string(), "-m".to_string(), "1".to_string()];
    if let Some(strategy) = &options.strategy {
        args.push(format!("--strategy={strategy}"));
    }
    if let Some(option) = &options.strategy_option {
        args.push(format!("--strategy-option={option}"));
    }
    args.extend(options.extra_options.iter().cloned());
    args.push(sha.to_string());
    args
}

/// Builds the `git config` calls setting the committer identity.
fn identity_args<'a>(user: &'a str, email: &'a str) -> [Vec<&'a str>; 2] {
    [
        vec!["config", "user.name", user],
        vec!["config", "user.email", email],
    ]
}

/// Builds the git calls resetting a reused clone to the remote tip of
/// `branch`, in order.
fn refresh_args<'a>(
    remote: &'a str,
    branch: &'a str,
    user: &'a str,
    email: &'a str,
) -> Vec<Vec<&'a str>> {
    let mut calls = vec![vec!["remote", "set-url", "origin", remote]];
    calls.extend(identity_args(user, email));
    calls.extend([
        vec!["fetch", "--quiet", "origin", branch],
        vec!["reset", "--hard"],
        vec!["checkout", "-B", branch, "FETCH_HEAD"],
    ]);
    calls
}

/// Builds the `git push` arguments.
#[must_use]
pub fn push_args<'a>(branch: &'a str, remote: &'a str, force: bool) -> Vec<&'a str> {
    let mut args = vec!["push"];
    if force {
        args.push("--force-with-lease");
    }
    args.extend([remote, branch]);
    args
}

/// Renders a git command for logs and errors with any URL credentials removed.
fn describe_command(args: &[&str]) -> String {
    args.iter()
        .map(|arg| match Url::parse(arg) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(None);
                let _ = url.set_username("");
                url.to_string()
            }
            _ => (*arg).to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
