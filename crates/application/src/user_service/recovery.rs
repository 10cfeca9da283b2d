use senselearn_core::AppError;
use senselearn_domain::{EmailAddress, OtpPurpose, validate_password};

use crate::SecurityEventKind;

use super::*;

impl UserService {
    /// Confirms the account email with a verification code.
    ///
    /// Already verified accounts succeed without consuming a code.
    pub async fn verify_email(
        &self,
        email: &str,
        code: &str,
        context: &RequestContext,
    ) -> AppResult<UserRecord> {
        let email_address = EmailAddress::new(email)?;
        let Some(user) = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?
        else {
            return Err(AppError::Validation(
                "Invalid or expired code".to_owned(),
            ));
        };

        if user.email_verified {
            return Ok(user);
        }

        self.otp_service
            .verify(&user.email, OtpPurpose::EmailVerification, code)
            .await?;
        self.user_repository.mark_email_verified(user.id).await?;

        self.record_event(
            SecurityEvent::new(SecurityEventKind::EmailVerified)
                .with_subject(user.email.clone())
                .with_context(context),
        )
        .await?;

        Ok(UserRecord {
            email_verified: true,
            ..user
        })
    }

    /// Mails a fresh code for the purpose.
    ///
    /// Always returns `Ok(())` for unknown or malformed emails so the response
    /// does not reveal whether an account exists. Verified accounts receive
    /// no new verification code.
    pub async fn resend_code(&self, email: &str, purpose: OtpPurpose) -> AppResult<()> {
        let Ok(email_address) = EmailAddress::new(email) else {
            return Ok(());
        };

        let Some(user) = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?
        else {
            return Ok(());
        };

        if purpose == OtpPurpose::EmailVerification && user.email_verified {
            return Ok(());
        }

        self.otp_service.issue(&user.email, purpose).await
    }

    /// Mails a password reset code when the account exists.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        self.resend_code(email, OtpPurpose::PasswordReset).await
    }

    /// Sets a new password after checking a password reset code, and clears
    /// any lockout on the account.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        context: &RequestContext,
    ) -> AppResult<()> {
        if email.trim().is_empty() || code.trim().is_empty() || new_password.is_empty() {
            return Err(AppError::Validation(
                "Email, code and new password are required".to_owned(),
            ));
        }

        let email_address = EmailAddress::new(email)?;
        validate_password(new_password)?;

        let Some(user) = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?
        else {
            return Err(AppError::Validation(
                "Invalid or expired code".to_owned(),
            ));
        };

        self.otp_service
            .verify(&user.email, OtpPurpose::PasswordReset, code)
            .await?;

        let password_hash = self.password_hasher.hash_password(new_password)?;
        self.user_repository
            .update_password(user.id, &password_hash)
            .await?;
        self.lockout_service.reset(&user.email).await?;

        self.record_event(
            SecurityEvent::new(SecurityEventKind::PasswordChanged)
                .with_subject(user.email.clone())
                .with_context(context)
                .with_detail("password reset by code"),
        )
        .await
    }
}
