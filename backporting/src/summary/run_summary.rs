//! Run summary types.

use super::result::BackportOutcome;

/// Summary of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Outcomes in target branch order.
    pub outcomes: Vec<BackportOutcome>,

    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Records the outcome of one target.
    pub fn record(&mut self, outcome: BackportOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of backport pull requests created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, BackportOutcome::Created { .. }))
    }

    /// Number of failed targets.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BackportOutcome::Failed { .. }))
    }

    /// Returns true if any target failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&BackportOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}
