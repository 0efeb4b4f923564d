//! Runner error types.

use crate::client::ClientError;
use crate::git::GitError;
use crate::summary::RunSummary;
use std::fmt;

/// Failure of the backport to a single target branch.
#[derive(Debug, thiserror::Error)]
pub enum BackportError {
    /// A local git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The backport pull request could not be created.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Failed targets of a run, in submission order.
#[derive(Debug, Default)]
pub struct BackportFailures {
    failures: Vec<(String, BackportError)>,
    summary: RunSummary,
}

impl BackportFailures {
    /// Records the failure of `target_branch`.
    pub fn push(&mut self, target_branch: impl Into<String>, error: BackportError) {
        self.failures.push((target_branch.into(), error));
    }

    /// Returns true if no target failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Iterates over `(target_branch, error)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BackportError)> {
        self.failures.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Attaches the outcomes of every target, successful ones included.
    #[must_use]
    pub fn with_summary(mut self, summary: RunSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Outcomes of the whole run.
    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

impl fmt::Display for BackportFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Failure occurred during one of the backports: [")?;
        for (i, (target, error)) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str(" ; ")?;
            }
            write!(f, "{target}: {error}")?;
        }
        f.write_str("]")
    }
}

impl std::error::Error for BackportFailures {}

/// Errors that can occur during a backport run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Host detection or client initialization errors.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The error notification template failed to compile.
    #[error(transparent)]
    Template(#[from] crate::templates::TemplateError),

    /// One or more targets failed.
    #[error(transparent)]
    Backport(#[from] BackportFailures),
}
