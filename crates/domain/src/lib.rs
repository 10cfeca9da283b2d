//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod password;
mod user;
mod validation;

pub use password::{
    PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, PASSWORD_SPECIAL_CHARACTERS, PasswordStrength,
    password_policy_violations, password_strength, validate_password,
};
pub use user::{EmailAddress, OtpPurpose, UserId, UserType};
pub use validation::{
    FieldRule, InputKind, InputThreat, ValidationReport, detect_sql_injection, detect_threats,
    detect_xss, is_valid_email, is_valid_phone, is_valid_url, is_valid_username, sanitize_input,
    validate_and_sanitize, validate_length,
};
