//! Console email adapter. One-time codes are written to the log instead of
//! being delivered.

use async_trait::async_trait;
use senselearn_application::EmailService;
use senselearn_core::AppResult;
use tracing::info;

/// Email service that logs every message under the `email` target.
#[derive(Clone, Debug)]
pub struct ConsoleEmailService {
    from_address: String,
}

impl ConsoleEmailService {
    /// Creates a console email service that reports `from_address` as sender.
    #[must_use]
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

impl Default for ConsoleEmailService {
    fn default() -> Self {
        Self::new("no-reply@senselearn.io")
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            target: "email",
            from = %self.from_address,
            to,
            subject,
            has_html = html_body.is_some(),
            "\n{text_body}"
        );

        Ok(())
    }
}
