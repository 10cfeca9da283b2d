//! Security event sink that writes structured records under the
//! `security` tracing target.

use async_trait::async_trait;
use senselearn_application::{SecurityEvent, SecurityEventSink};
use senselearn_core::AppResult;
use tracing::{info, warn};

/// Writes security events to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSecurityEventSink;

impl TracingSecurityEventSink {
    /// Creates a new sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecurityEventSink for TracingSecurityEventSink {
    async fn append_event(&self, event: SecurityEvent) -> AppResult<()> {
        let subject = event.subject.as_deref().unwrap_or("-");
        let ip_address = event.ip_address.as_deref().unwrap_or("unknown");
        let user_agent = event.user_agent.as_deref().unwrap_or("-");
        let detail = event.detail.as_deref().unwrap_or("");

        if event.kind.is_warning() {
            warn!(
                target: "security",
                event_type = event.kind.as_str(),
                subject,
                ip_address,
                user_agent,
                detail,
                "security event"
            );
        } else {
            info!(
                target: "security",
                event_type = event.kind.as_str(),
                subject,
                ip_address,
                user_agent,
                detail,
                "security event"
            );
        }

        Ok(())
    }
}
