use chrono::{DateTime, SecondsFormat, Utc};
use senselearn_application::{LockoutStatus, TutorProfile, UserRecord};
use senselearn_core::UserIdentity;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration form. Numeric tutor fields are accepted as JSON numbers or
/// numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub user_type: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub disability_type: Option<String>,
    pub qualifications: Option<String>,
    pub subjects: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<serde_json::Value>,
    pub hourly_rate: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendOtpRequest {
    pub email: String,
    pub purpose: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TutorProfileResponse {
    pub qualifications: String,
    pub subjects: String,
    pub bio: String,
    pub experience_years: u32,
    pub hourly_rate: f64,
}

impl From<&TutorProfile> for TutorProfileResponse {
    fn from(profile: &TutorProfile) -> Self {
        Self {
            qualifications: profile.qualifications.clone(),
            subjects: profile.subjects.clone(),
            bio: profile.bio.clone(),
            experience_years: profile.experience_years,
            hourly_rate: profile.hourly_rate,
        }
    }
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub user_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disability_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor_profile: Option<TutorProfileResponse>,
    pub email_verified: bool,
    pub created_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            phone_number: user.phone_number.clone(),
            user_type: user.user_type.as_str(),
            disability_type: user.disability_type.clone(),
            tutor_profile: user.tutor_profile.as_ref().map(TutorProfileResponse::from),
            email_verified: user.email_verified,
            created_at: rfc3339(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_type: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct AuthenticatedUserResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct LoginFailureResponse {
    pub message: String,
    pub failed_attempts: u32,
    pub max_attempts: u32,
    pub remaining_attempts: u32,
}

impl LoginFailureResponse {
    pub fn from_status(message: impl Into<String>, status: &LockoutStatus) -> Self {
        Self {
            message: message.into(),
            failed_attempts: status.failed_attempts,
            max_attempts: status.max_attempts,
            remaining_attempts: status.remaining_attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LockedAccountResponse {
    pub message: String,
    pub locked_until: Option<String>,
    pub retry_after_seconds: i64,
}

impl LockedAccountResponse {
    pub fn from_status(status: &LockoutStatus, now: DateTime<Utc>) -> Self {
        let retry_after_seconds = status.retry_after_seconds(now);
        let minutes = (retry_after_seconds + 59) / 60;
        Self {
            message: format!(
                "Account is temporarily locked due to too many failed login attempts. \
                 Please try again in {minutes} minutes."
            ),
            locked_until: status.locked_until.map(rfc3339),
            retry_after_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserIdentityResponse {
    pub subject: String,
    pub display_name: String,
    pub email: String,
    pub user_type: String,
}

impl From<UserIdentity> for UserIdentityResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().to_owned(),
            user_type: identity.user_type().to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthEndpointResponse {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AuthEndpointsResponse {
    pub service: &'static str,
    pub endpoints: Vec<AuthEndpointResponse>,
}

fn rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
