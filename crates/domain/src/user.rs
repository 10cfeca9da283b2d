//! User domain types.

use std::str::FromStr;

use senselearn_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::is_valid_email;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maximum length of an email address (RFC 5321 path limit).
const EMAIL_MAX_LENGTH: usize = 254;

/// Validated, canonical (trimmed and lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let canonical = value.trim().to_lowercase();

        if canonical.is_empty() {
            return Err(AppError::Validation("Email is required".to_owned()));
        }

        if canonical.len() > EMAIL_MAX_LENGTH || !is_valid_email(&canonical) {
            return Err(AppError::Validation(
                "Please provide a valid email address".to_owned(),
            ));
        }

        Ok(Self(canonical))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the part before `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Account role chosen at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Learner account; requires a disability type.
    #[default]
    Student,
    /// Teaching account; requires a tutor profile and manual verification.
    Tutor,
}

impl UserType {
    /// Every accepted user type.
    pub const ALL: [Self; 2] = [Self::Student, Self::Tutor];

    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
        }
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "tutor" => Ok(Self::Tutor),
            _ => Err(AppError::Validation(format!(
                "Invalid user type. Must be one of: {}",
                Self::ALL.map(|user_type| user_type.as_str()).join(", ")
            ))),
        }
    }
}

/// Purpose a one-time code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    /// Confirms ownership of the registration email.
    EmailVerification,
    /// Authorizes a password reset.
    PasswordReset,
}

impl OtpPurpose {
    /// Returns the storage string for this purpose.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl FromStr for OtpPurpose {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email_verification" | "verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(AppError::Validation(format!(
                "unknown one-time code purpose '{value}'"
            ))),
        }
    }
}
