//! Message templates rendered with Handlebars.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, NotificationContext, NotificationRenderer};

/// Comment posted on the original pull request when a backport fails.
pub const DEFAULT_ERROR_NOTIFICATION: &str =
    "The backport to `{{target_branch}}` failed. Check the latest run for more details.";
