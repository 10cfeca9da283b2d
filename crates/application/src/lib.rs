//! Application services and ports.

#![forbid(unsafe_code)]

mod account_lockout_service;
mod otp_service;
mod rate_limit_service;
mod security_event_service;
mod user_service;

pub use account_lockout_service::{
    AccountLockoutService, LockoutPolicy, LockoutRepository, LockoutState, LockoutStatus,
    MAX_LOCKOUT_DURATION_MINUTES,
};
pub use otp_service::{
    EmailService, MAX_OTP_VALIDITY_MINUTES, OtpCheck, OtpRecord, OtpRepository, OtpService,
    OtpSettings,
};
pub use rate_limit_service::{
    AttemptInfo, MAX_WINDOW_SECONDS, RateLimitDecision, RateLimitRepository, RateLimitRule,
    RateLimitService,
};
pub use security_event_service::{
    RequestContext, SecurityEvent, SecurityEventKind, SecurityEventService, SecurityEventSink,
};
pub use user_service::{
    LoginOutcome, NewUser, PasswordHasher, RegisterParams, RegistrationSettings, TutorProfile,
    UserRecord, UserRepository, UserService,
};
