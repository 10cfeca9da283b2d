//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod console_email_service;
mod in_memory_lockout_repository;
mod in_memory_otp_repository;
mod in_memory_rate_limit_repository;
mod in_memory_user_repository;
mod tracing_security_event_sink;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use console_email_service::ConsoleEmailService;
pub use in_memory_lockout_repository::InMemoryLockoutRepository;
pub use in_memory_otp_repository::InMemoryOtpRepository;
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_user_repository::InMemoryUserRepository;
pub use tracing_security_event_sink::TracingSecurityEventSink;
