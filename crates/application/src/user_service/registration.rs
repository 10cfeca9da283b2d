use senselearn_core::{AppError, NonEmptyString};
use senselearn_domain::{
    EmailAddress, FieldRule, InputKind, OtpPurpose, UserType, detect_threats, sanitize_input,
    validate_and_sanitize, validate_password,
};
use serde_json::{Map, Value};

use crate::SecurityEventKind;

use super::*;

const FULL_NAME_MAX_LENGTH: usize = 255;

impl UserService {
    /// Registers a new unverified user and mails an email verification code.
    pub async fn register(&self, params: RegisterParams) -> AppResult<UserRecord> {
        let email_address = EmailAddress::new(&params.email)?;

        let profile = validate_and_sanitize(&profile_fields(&params), &profile_schema());
        if let Some(error) = profile.errors.first() {
            return Err(AppError::Validation(error.clone()));
        }
        let full_name = NonEmptyString::new(profile.value("full_name").unwrap_or_default())
            .map_err(|_| AppError::Validation("full_name is required".to_owned()))?;
        let username = profile.value("username").map(ToOwned::to_owned);
        let phone_number = profile.value("phone_number").map(ToOwned::to_owned);

        validate_password(&params.password)?;

        let user_type = optional_text(params.user_type.as_deref())
            .map(|value| value.parse::<UserType>())
            .transpose()?
            .unwrap_or_default();

        let (disability_type, tutor_profile) = match user_type {
            UserType::Student => (Some(self.student_disability_type(&params)?), None),
            UserType::Tutor => (None, Some(tutor_profile(&params)?)),
        };

        self.report_threats(&params, full_name.as_str(), tutor_profile.as_ref())
            .await?;

        if self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?
            .is_some()
        {
            // Same hashing cost as the success path.
            let _ = self.password_hasher.hash_password(&params.password);
            return Err(AppError::Conflict(
                "An account with this email already exists".to_owned(),
            ));
        }

        if let Some(username) = &username
            && self
                .user_repository
                .find_by_username(username)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict("Username is already taken".to_owned()));
        }

        let password_hash = self.password_hasher.hash_password(&params.password)?;
        let user = self
            .user_repository
            .create(NewUser {
                email: email_address.as_str().to_owned(),
                username,
                full_name: full_name.into(),
                phone_number,
                user_type,
                disability_type,
                tutor_profile,
                password_hash,
            })
            .await?;

        self.record_event(
            SecurityEvent::new(SecurityEventKind::Registration)
                .with_subject(user.email.clone())
                .with_context(&params.context)
                .with_detail(user.user_type.as_str()),
        )
        .await?;

        self.otp_service
            .issue(&user.email, OtpPurpose::EmailVerification)
            .await?;

        Ok(user)
    }

    fn student_disability_type(&self, params: &RegisterParams) -> AppResult<String> {
        let Some(disability_type) = optional_text(params.disability_type.as_deref()) else {
            return Err(AppError::Validation(
                "Please select a disability type".to_owned(),
            ));
        };

        let disability_type = disability_type.to_lowercase();
        if !self
            .settings
            .valid_disability_types
            .iter()
            .any(|valid| valid.eq_ignore_ascii_case(&disability_type))
        {
            return Err(AppError::Validation(format!(
                "Invalid disability type. Must be one of: {}",
                self.settings.valid_disability_types.join(", ")
            )));
        }

        Ok(disability_type)
    }

    async fn report_threats(
        &self,
        params: &RegisterParams,
        full_name: &str,
        tutor_profile: Option<&TutorProfile>,
    ) -> AppResult<()> {
        let mut fields = vec![("full_name", full_name)];
        if let Some(profile) = tutor_profile {
            fields.extend([
                ("qualifications", profile.qualifications.as_str()),
                ("subjects", profile.subjects.as_str()),
                ("bio", profile.bio.as_str()),
            ]);
        }

        for (field, value) in fields {
            for threat in detect_threats(value) {
                self.record_event(
                    SecurityEvent::new(SecurityEventKind::InjectionAttempt)
                        .with_subject(params.email.trim().to_lowercase())
                        .with_context(&params.context)
                        .with_detail(format!("{} in {field}: {value}", threat.as_str())),
                )
                .await?;
            }
        }

        Ok(())
    }
}

fn tutor_profile(params: &RegisterParams) -> AppResult<TutorProfile> {
    let (Some(qualifications), Some(subjects), Some(bio)) = (
        optional_text(params.qualifications.as_deref()),
        optional_text(params.subjects.as_deref()),
        optional_text(params.bio.as_deref()),
    ) else {
        return Err(AppError::Validation(
            "Tutors must provide qualifications, subjects and bio".to_owned(),
        ));
    };

    let experience_years = params.experience_years.ok_or_else(|| {
        AppError::Validation("Experience years is required for tutors".to_owned())
    })?;
    let experience_years = u32::try_from(experience_years).map_err(|_| {
        AppError::Validation("Experience years must be a non-negative number".to_owned())
    })?;

    let hourly_rate = params
        .hourly_rate
        .ok_or_else(|| AppError::Validation("Hourly rate is required for tutors".to_owned()))?;
    if !hourly_rate.is_finite() || hourly_rate <= 0.0 {
        return Err(AppError::Validation(
            "Hourly rate must be greater than zero".to_owned(),
        ));
    }

    Ok(TutorProfile {
        qualifications,
        subjects,
        bio,
        experience_years,
        hourly_rate,
    })
}

fn profile_schema() -> [(&'static str, FieldRule); 3] {
    [
        (
            "full_name",
            FieldRule::new(InputKind::Text)
                .required()
                .length(1, Some(FULL_NAME_MAX_LENGTH)),
        ),
        ("username", FieldRule::new(InputKind::Username)),
        ("phone_number", FieldRule::new(InputKind::Phone)),
    ]
}

/// Collects the profile fields checked by [`profile_schema`]; blank values
/// are left out.
fn profile_fields(params: &RegisterParams) -> Map<String, Value> {
    let mut fields = Map::new();
    for (field, value) in [
        ("full_name", Some(params.full_name.as_str())),
        ("username", params.username.as_deref()),
        ("phone_number", params.phone_number.as_deref()),
    ] {
        if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
            fields.insert(field.to_owned(), Value::String(value.to_owned()));
        }
    }
    fields
}

/// Sanitizes an optional text field; blank values become `None`.
fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(|value| sanitize_input(value, InputKind::Text))
        .filter(|value| !value.is_empty())
}
