//! User management ports and application service.
//!
//! Owns registration, password login with account lockout, email
//! verification and password recovery through one-time codes.

mod login;
mod recovery;
mod registration;


use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use senselearn_core::{AppResult, UserIdentity};
use senselearn_domain::{UserId, UserType};

use crate::{
    AccountLockoutService, LockoutStatus, OtpService, RequestContext, SecurityEvent,
    SecurityEventService,
};

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Tutor profile captured at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorProfile {
    /// Degrees and certificates.
    pub qualifications: String,
    /// Subjects offered.
    pub subjects: String,
    /// Free-form introduction.
    pub bio: String,
    /// Years of teaching experience.
    pub experience_years: u32,
    /// Hourly rate in the platform currency.
    pub hourly_rate: f64,
}

/// User record returned by repository queries.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical email address.
    pub email: String,
    /// Optional unique handle.
    pub username: Option<String>,
    /// Full name shown in the UI.
    pub full_name: String,
    /// Optional E.164 phone number.
    pub phone_number: Option<String>,
    /// Account role.
    pub user_type: UserType,
    /// Disability type for students.
    pub disability_type: Option<String>,
    /// Profile for tutors.
    pub tutor_profile: Option<TutorProfile>,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Returns the identity stored in the session.
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity::new(
            self.id.to_string(),
            self.full_name.clone(),
            self.email.clone(),
            self.user_type.as_str(),
        )
    }
}

/// Validated fields for a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    /// Canonical email address.
    pub email: String,
    /// Optional unique handle.
    pub username: Option<String>,
    /// Full name.
    pub full_name: String,
    /// Optional E.164 phone number.
    pub phone_number: Option<String>,
    /// Account role.
    pub user_type: UserType,
    /// Disability type for students.
    pub disability_type: Option<String>,
    /// Profile for tutors.
    pub tutor_profile: Option<TutorProfile>,
    /// Argon2id password hash.
    pub password_hash: String,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by canonical email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Finds a user by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>>;

    /// Creates an unverified user. Fails with `Conflict` when the email or
    /// username is taken.
    async fn create(&self, user: NewUser) -> AppResult<UserRecord>;

    /// Updates the password hash for a user.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()>;

    /// Marks the user's email as verified.
    async fn mark_email_verified(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps domain/application free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

// ---------------------------------------------------------------------------
// Authentication outcome
// ---------------------------------------------------------------------------

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials accepted. Session can be established.
    Authenticated(UserRecord),
    /// Credentials rejected; the status carries the remaining attempts.
    InvalidCredentials(LockoutStatus),
    /// The account is locked, either already or by this failure.
    Locked(LockoutStatus),
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Parameters for user registration, as submitted.
#[derive(Debug, Clone, Default)]
pub struct RegisterParams {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Full name.
    pub full_name: String,
    /// `student` (default) or `tutor`.
    pub user_type: Option<String>,
    /// Optional unique handle.
    pub username: Option<String>,
    /// Optional E.164 phone number.
    pub phone_number: Option<String>,
    /// Required for students.
    pub disability_type: Option<String>,
    /// Required for tutors.
    pub qualifications: Option<String>,
    /// Required for tutors.
    pub subjects: Option<String>,
    /// Required for tutors.
    pub bio: Option<String>,
    /// Required for tutors; must not be negative.
    pub experience_years: Option<i64>,
    /// Required for tutors; must be positive.
    pub hourly_rate: Option<f64>,
    /// Caller metadata for security events.
    pub context: RequestContext,
}

/// Registration rules that come from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSettings {
    /// Accepted `disability_type` values for students.
    pub valid_disability_types: Vec<String>,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            valid_disability_types: [
                "visual",
                "hearing",
                "motor",
                "cognitive",
                "learning",
                "speech",
                "none",
            ]
            .map(str::to_owned)
            .to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for user authentication and registration.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    lockout_service: AccountLockoutService,
    otp_service: OtpService,
    security_event_service: SecurityEventService,
    settings: RegistrationSettings,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        lockout_service: AccountLockoutService,
        otp_service: OtpService,
        security_event_service: SecurityEventService,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
            lockout_service,
            otp_service,
            security_event_service,
            settings,
        }
    }

    /// Returns a user record by ID, if it exists.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_id(user_id).await
    }

    /// Returns a user record by email, if it exists.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_email(email).await
    }

    /// Returns the lockout service used by login.
    #[must_use]
    pub fn lockout_service(&self) -> &AccountLockoutService {
        &self.lockout_service
    }

    async fn record_event(&self, event: SecurityEvent) -> AppResult<()> {
        self.security_event_service.record_event(event).await
    }
}
