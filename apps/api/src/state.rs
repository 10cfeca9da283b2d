use senselearn_application::{
    OtpService, RateLimitService, SecurityEventService, UserService,
};

use crate::api_config::RateLimitRules;

/// Request-pipeline switches taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SecuritySettings {
    pub trust_forwarded_for: bool,
    pub csrf_enabled: bool,
    pub cookie_secure: bool,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub otp_service: OtpService,
    pub rate_limit_service: RateLimitService,
    pub security_event_service: SecurityEventService,
    pub rate_limits: RateLimitRules,
    pub security: SecuritySettings,
}
