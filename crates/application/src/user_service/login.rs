use senselearn_core::AppError;
use senselearn_domain::EmailAddress;

use crate::SecurityEventKind;

use super::*;

impl UserService {
    /// Authenticates a user with email and password.
    ///
    /// The lock is checked before the password so a locked account cannot be
    /// probed. Unknown emails are counted against the lockout the same way as
    /// existing accounts.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        context: &RequestContext,
    ) -> AppResult<LoginOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_owned(),
            ));
        }

        let email_address = EmailAddress::new(email)?;
        let email = email_address.as_str();

        let status = self.lockout_service.status(email).await?;
        if status.locked {
            self.record_event(
                SecurityEvent::new(SecurityEventKind::AccountLocked)
                    .with_subject(email)
                    .with_context(context)
                    .with_detail("login attempt while locked"),
            )
            .await?;
            return Ok(LoginOutcome::Locked(status));
        }

        let user = self.user_repository.find_by_email(email).await?;
        let password_valid = match &user {
            Some(user) => self
                .password_hasher
                .verify_password(password, &user.password_hash)?,
            None => {
                // Same hashing cost as a real verification.
                let _ = self.password_hasher.hash_password(password);
                false
            }
        };

        let Some(user) = user.filter(|_| password_valid) else {
            let status = self.lockout_service.record_failure(email).await?;
            self.record_event(
                SecurityEvent::new(SecurityEventKind::LoginFailed)
                    .with_subject(email)
                    .with_context(context)
                    .with_detail(format!(
                        "attempt {} of {}",
                        status.failed_attempts, status.max_attempts
                    )),
            )
            .await?;

            if status.locked {
                self.record_event(
                    SecurityEvent::new(SecurityEventKind::AccountLocked)
                        .with_subject(email)
                        .with_context(context)
                        .with_detail(format!("{} failed attempts", status.failed_attempts)),
                )
                .await?;
                return Ok(LoginOutcome::Locked(status));
            }

            return Ok(LoginOutcome::InvalidCredentials(status));
        };

        self.lockout_service.record_success(email).await?;
        self.record_event(
            SecurityEvent::new(SecurityEventKind::LoginSucceeded)
                .with_subject(email)
                .with_context(context),
        )
        .await?;

        Ok(LoginOutcome::Authenticated(user))
    }
}
