use std::sync::Arc;

use senselearn_application::{
    AccountLockoutService, EmailService, OtpService, RateLimitService, SecurityEventService,
    UserService,
};
use senselearn_infrastructure::{
    Argon2PasswordHasher, InMemoryLockoutRepository, InMemoryOtpRepository,
    InMemoryRateLimitRepository, InMemoryUserRepository, TracingSecurityEventSink,
};

use crate::api_config::ApiConfig;
use crate::state::{AppState, SecuritySettings};

pub fn build_app_state(config: &ApiConfig, email_service: Arc<dyn EmailService>) -> AppState {
    let security_event_service =
        SecurityEventService::new(Arc::new(TracingSecurityEventSink::new()));

    let rate_limit_service = RateLimitService::new(Arc::new(InMemoryRateLimitRepository::new()));

    let lockout_service = AccountLockoutService::new(
        Arc::new(InMemoryLockoutRepository::new()),
        config.lockout,
    );

    let otp_service = OtpService::new(
        Arc::new(InMemoryOtpRepository::new()),
        email_service,
        config.otp,
    );

    let user_service = UserService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(Argon2PasswordHasher::new()),
        lockout_service,
        otp_service.clone(),
        security_event_service.clone(),
        config.registration.clone(),
    );

    AppState {
        user_service,
        otp_service,
        rate_limit_service,
        security_event_service,
        rate_limits: config.rate_limits.clone(),
        security: SecuritySettings {
            trust_forwarded_for: config.trust_forwarded_for,
            csrf_enabled: config.csrf_enabled,
            cookie_secure: config.cookie_secure,
        },
    }
}
