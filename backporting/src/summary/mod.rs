//! Run summary types.

mod result;
mod run_summary;

pub use result::BackportOutcome;
pub use run_summary::RunSummary;
