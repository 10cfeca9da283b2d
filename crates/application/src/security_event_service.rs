use std::sync::Arc;

use async_trait::async_trait;

use senselearn_core::AppResult;

/// Maximum number of characters of a suspicious value kept in an event.
const DETAIL_MAX_CHARS: usize = 100;

/// Category of a security-relevant event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    /// Credentials were accepted.
    LoginSucceeded,
    /// Credentials were rejected.
    LoginFailed,
    /// An account crossed the failure threshold or a locked account was tried.
    AccountLocked,
    /// A caller exceeded a rate-limit rule.
    RateLimitExceeded,
    /// A state-changing request carried no or a wrong CSRF token.
    CsrfViolation,
    /// Input matched an SQL injection or XSS pattern.
    InjectionAttempt,
    /// A password was reset.
    PasswordChanged,
    /// A new account was created.
    Registration,
    /// An email address was verified.
    EmailVerified,
    /// A session was ended.
    Logout,
}

impl SecurityEventKind {
    /// Returns a stable event type identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::AccountLocked => "account_locked",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::CsrfViolation => "csrf_violation",
            Self::InjectionAttempt => "injection_attempt",
            Self::PasswordChanged => "password_changed",
            Self::Registration => "registration",
            Self::EmailVerified => "email_verified",
            Self::Logout => "logout",
        }
    }

    /// Returns whether the event indicates a possible attack.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed
                | Self::AccountLocked
                | Self::RateLimitExceeded
                | Self::CsrfViolation
                | Self::InjectionAttempt
        )
    }
}

/// Caller metadata captured from the HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
}

/// Security event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEvent {
    /// Event category.
    pub kind: SecurityEventKind,
    /// Account email or user id, if known.
    pub subject: Option<String>,
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
    /// Free-form detail, truncated to a bounded length.
    pub detail: Option<String>,
}

impl SecurityEvent {
    /// Creates an event with no subject, request metadata or detail.
    #[must_use]
    pub fn new(kind: SecurityEventKind) -> Self {
        Self {
            kind,
            subject: None,
            ip_address: None,
            user_agent: None,
            detail: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Copies IP address and user agent from the request context.
    #[must_use]
    pub fn with_context(mut self, context: &RequestContext) -> Self {
        self.ip_address.clone_from(&context.ip_address);
        self.user_agent.clone_from(&context.user_agent);
        self
    }

    /// Sets the detail, keeping at most 100 characters.
    #[must_use]
    pub fn with_detail(mut self, detail: impl AsRef<str>) -> Self {
        self.detail = Some(detail.as_ref().chars().take(DETAIL_MAX_CHARS).collect());
        self
    }
}

/// Sink port for security events. Infrastructure writes them to a log.
#[async_trait]
pub trait SecurityEventSink: Send + Sync {
    /// Appends a security event.
    async fn append_event(&self, event: SecurityEvent) -> AppResult<()>;
}

/// Application service for security event recording.
#[derive(Clone)]
pub struct SecurityEventService {
    sink: Arc<dyn SecurityEventSink>,
}

impl SecurityEventService {
    /// Creates a service from a sink implementation.
    #[must_use]
    pub fn new(sink: Arc<dyn SecurityEventSink>) -> Self {
        Self { sink }
    }

    /// Records a security event.
    pub async fn record_event(&self, event: SecurityEvent) -> AppResult<()> {
        self.sink.append_event(event).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use senselearn_core::AppError;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SecurityEvent>>,
    }

    #[async_trait]
    impl SecurityEventSink for RecordingSink {
        async fn append_event(&self, event: SecurityEvent) -> AppResult<()> {
            self.events
                .lock()
                .map_err(|error| AppError::Internal(format!("failed to lock sink: {error}")))?
                .push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn recorded_event_reaches_sink() -> AppResult<()> {
        let sink = Arc::new(RecordingSink::default());
        let service = SecurityEventService::new(sink.clone());
        let context = RequestContext {
            ip_address: Some("203.0.113.9".to_owned()),
            user_agent: Some("curl/8".to_owned()),
        };

        service
            .record_event(
                SecurityEvent::new(SecurityEventKind::LoginFailed)
                    .with_subject("ada@senselearn.io")
                    .with_context(&context),
            )
            .await?;

        let events = sink.events.lock().map(|guard| guard.clone()).unwrap_or_default();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(events[0].subject.as_deref(), Some("ada@senselearn.io"));
        Ok(())
    }

    #[test]
    fn detail_is_truncated() {
        let event = SecurityEvent::new(SecurityEventKind::InjectionAttempt).with_detail("x".repeat(500));
        assert_eq!(event.detail.map(|detail| detail.len()), Some(DETAIL_MAX_CHARS));
    }

    #[test]
    fn only_attack_indicators_are_warnings() {
        assert!(SecurityEventKind::CsrfViolation.is_warning());
        assert!(!SecurityEventKind::LoginSucceeded.is_warning());
        assert!(!SecurityEventKind::PasswordChanged.is_warning());
    }
}
