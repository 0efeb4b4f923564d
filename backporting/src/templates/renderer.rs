//! Notification message renderer.

use super::TemplateError;
use handlebars::{no_escape, Handlebars};
use serde::Serialize;

const NOTIFICATION_TEMPLATE: &str = "error_notification";

/// Creates a Handlebars registry for plain text messages.
///
/// Output is never HTML escaped, and strict mode turns unknown variables
/// into errors.
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs
}

/// Values available to the error notification template.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationContext<'a> {
    /// Target branch whose backport failed.
    pub target_branch: &'a str,
    /// Browser URL of the original pull request.
    pub pull_request_url: &'a str,
}

/// Renders the comment posted when a backport fails.
#[derive(Debug)]
pub struct NotificationRenderer {
    handlebars: Handlebars<'static>,
}

impl NotificationRenderer {
    /// Compiles `template`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::SyntaxError`] if the template does not parse.
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let mut handlebars = create_handlebars_registry();
        handlebars.register_template_string(NOTIFICATION_TEMPLATE, template)?;
        Ok(Self { handlebars })
    }

    /// Renders the message for one failed target.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::RenderError`] if the template references an
    /// unknown variable.
    pub fn render(&self, context: &NotificationContext<'_>) -> Result<String, TemplateError> {
        Ok(self.handlebars.render(NOTIFICATION_TEMPLATE, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::DEFAULT_ERROR_NOTIFICATION;

    fn context() -> NotificationContext<'static> {
        NotificationContext {
            target_branch: "v1.x",
            pull_request_url: "https://github.com/owner/reponame/pull/2368",
        }
    }

    #[test]
    fn renders_default_message() {
        let renderer = NotificationRenderer::new(DEFAULT_ERROR_NOTIFICATION).unwrap();
        assert_eq!(
            renderer.render(&context()).unwrap(),
            "The backport to `v1.x` failed. Check the latest run for more details."
        );
    }

    #[test]
    fn does_not_escape_markdown() {
        let renderer =
            NotificationRenderer::new("<b>{{target_branch}}</b> & [PR]({{pull_request_url}})")
                .unwrap();
        assert_eq!(
            renderer.render(&context()).unwrap(),
            "<b>v1.x</b> & [PR](https://github.com/owner/reponame/pull/2368)"
        );
    }

    #[test]
    fn rejects_unknown_variables() {
        let renderer = NotificationRenderer::new("{{missing}}").unwrap();
        assert!(matches!(
            renderer.render(&context()),
            Err(TemplateError::RenderError(_))
        ));
    }

    #[test]
    fn rejects_malformed_template() {
        assert!(matches!(
            NotificationRenderer::new("{{#if target_branch}}"),
            Err(TemplateError::SyntaxError(_))
        ));
    }
}
