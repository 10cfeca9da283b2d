//! One-time codes for email verification and password resets.
//!
//! Codes are numeric, stored as SHA-256 hashes, single-use and
//! time-limited. Issuing a code replaces any earlier code for the same
//! email and purpose.

mod token_crypto;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use senselearn_core::{AppError, AppResult};
use senselearn_domain::OtpPurpose;

use token_crypto::{generate_numeric_code, hash_code};

/// Stored one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// SHA-256 hash of the code.
    pub code_hash: String,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// Wrong guesses so far.
    pub failed_attempts: u32,
}

/// Result of checking a submitted code against the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Code matched; the record is consumed.
    Valid,
    /// Code did not match; the record stays with one more failure.
    Invalid,
    /// The record had expired; it is removed.
    Expired,
    /// Too many wrong guesses; the record is removed.
    Exhausted,
    /// No record exists.
    Missing,
}

impl OtpCheck {
    /// Returns whether the stored record must be removed after this outcome.
    #[must_use]
    pub fn consumes_record(&self) -> bool {
        !matches!(self, Self::Invalid | Self::Missing)
    }
}

impl OtpRecord {
    /// Compares a code hash with this record and updates the failure counter.
    pub fn evaluate(
        &mut self,
        code_hash: &str,
        max_failed_attempts: u32,
        now: DateTime<Utc>,
    ) -> OtpCheck {
        if now >= self.expires_at {
            return OtpCheck::Expired;
        }

        if self.code_hash == code_hash {
            return OtpCheck::Valid;
        }

        self.failed_attempts = self.failed_attempts.saturating_add(1);
        if self.failed_attempts >= max_failed_attempts {
            OtpCheck::Exhausted
        } else {
            OtpCheck::Invalid
        }
    }
}

/// Repository port for one-time codes, keyed by email and purpose.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Stores a record, replacing any earlier one for the same key.
    async fn store(&self, email: &str, purpose: OtpPurpose, record: OtpRecord) -> AppResult<()>;

    /// Evaluates a code hash with [`OtpRecord::evaluate`] and removes the
    /// record when [`OtpCheck::consumes_record`] says so, atomically.
    async fn verify(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code_hash: &str,
        max_failed_attempts: u32,
        now: DateTime<Utc>,
    ) -> AppResult<OtpCheck>;

    /// Drops expired records. Returns the number removed.
    async fn remove_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Port for sending emails. Infrastructure provides a console implementation.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text or HTML email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}

/// Longest validity a code may be configured with: one day.
pub const MAX_OTP_VALIDITY_MINUTES: i64 = 24 * 60;

/// One-time code settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSettings {
    /// Number of digits.
    pub length: usize,
    /// Validity in minutes.
    pub validity_minutes: i64,
    /// Wrong guesses that invalidate a code.
    pub max_failed_attempts: u32,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            length: 6,
            validity_minutes: 10,
            max_failed_attempts: 5,
        }
    }
}

/// Application service for issuing and verifying one-time codes.
#[derive(Clone)]
pub struct OtpService {
    repository: Arc<dyn OtpRepository>,
    email_service: Arc<dyn EmailService>,
    settings: OtpSettings,
}

impl OtpService {
    /// Creates a new one-time code service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn OtpRepository>,
        email_service: Arc<dyn EmailService>,
        settings: OtpSettings,
    ) -> Self {
        Self {
            repository,
            email_service,
            settings,
        }
    }

    /// Generates a code for the email, stores its hash and mails it.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> AppResult<()> {
        let code = generate_numeric_code(self.settings.length)?;
        let expires_at = Duration::try_minutes(self.settings.validity_minutes)
            .and_then(|validity| Utc::now().checked_add_signed(validity))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "one-time code validity is out of range: {} minutes",
                    self.settings.validity_minutes
                ))
            })?;

        self.repository
            .store(
                email,
                purpose,
                OtpRecord {
                    code_hash: hash_code(&code),
                    expires_at,
                    failed_attempts: 0,
                },
            )
            .await?;

        let minutes = self.settings.validity_minutes;
        let (subject, text_body) = match purpose {
            OtpPurpose::EmailVerification => (
                "Your SenseLearn verification code",
                format!(
                    "Welcome to SenseLearn!\n\n\
                     Your verification code is: {code}\n\n\
                     This code expires in {minutes} minutes."
                ),
            ),
            OtpPurpose::PasswordReset => (
                "Your SenseLearn password reset code",
                format!(
                    "You requested a password reset.\n\n\
                     Your reset code is: {code}\n\n\
                     This code expires in {minutes} minutes.\n\n\
                     If you did not request this, you can safely ignore this email."
                ),
            ),
        };

        self.email_service
            .send_email(email, subject, &text_body, None)
            .await
    }

    /// Verifies and consumes a code.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> AppResult<()> {
        self.verify_at(email, purpose, code, Utc::now()).await
    }

    /// Verifies and consumes a code as of `now`.
    pub async fn verify_at(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("Code is required".to_owned()));
        }

        let check = self
            .repository
            .verify(
                email,
                purpose,
                &hash_code(code),
                self.settings.max_failed_attempts,
                now,
            )
            .await?;

        match check {
            OtpCheck::Valid => Ok(()),
            OtpCheck::Invalid => Err(AppError::Validation("Invalid code".to_owned())),
            OtpCheck::Expired => Err(AppError::Validation(
                "Code has expired. Please request a new one.".to_owned(),
            )),
            OtpCheck::Exhausted => Err(AppError::Validation(
                "Too many incorrect attempts. Please request a new code.".to_owned(),
            )),
            OtpCheck::Missing => Err(AppError::Validation(
                "Invalid or expired code".to_owned(),
            )),
        }
    }

    /// Drops expired codes. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        self.repository.remove_expired(Utc::now()).await
    }
}
