//! Per-target outcome types.

/// Outcome of the backport to one target branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackportOutcome {
    /// The backport pull request was created.
    Created {
        /// Target branch.
        target_branch: String,
        /// Browser URL of the new pull request.
        url: String,
    },

    /// Dry run: commits were picked locally, nothing was pushed.
    DryRun {
        /// Target branch.
        target_branch: String,
        /// Local backport branch.
        head: String,
    },

    /// The backport failed.
    Failed {
        /// Target branch.
        target_branch: String,
        /// Error message.
        error: String,
    },
}

impl BackportOutcome {
    /// Target branch this outcome belongs to.
    #[must_use]
    pub fn target_branch(&self) -> &str {
        match self {
            Self::Created { target_branch, .. }
            | Self::DryRun { target_branch, .. }
            | Self::Failed { target_branch, .. } => target_branch,
        }
    }
}
