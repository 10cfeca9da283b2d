use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use senselearn_core::{AppError, AppResult};
use senselearn_domain::OtpPurpose;

use super::{EmailService, OtpCheck, OtpRecord, OtpRepository, OtpService, OtpSettings};

#[derive(Default)]
struct TestOtpRepo {
    records: Mutex<HashMap<(String, OtpPurpose), OtpRecord>>,
}

#[async_trait]
impl OtpRepository for TestOtpRepo {
    async fn store(&self, email: &str, purpose: OtpPurpose, record: OtpRecord) -> AppResult<()> {
        self.records
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?
            .insert((email.to_owned(), purpose), record);
        Ok(())
    }

    async fn verify(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code_hash: &str,
        max_failed_attempts: u32,
        now: DateTime<Utc>,
    ) -> AppResult<OtpCheck> {
        let mut records = self
            .records
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?;
        let key = (email.to_owned(), purpose);
        let Some(record) = records.get_mut(&key) else {
            return Ok(OtpCheck::Missing);
        };

        let check = record.evaluate(code_hash, max_failed_attempts, now);
        if check.consumes_record() {
            records.remove(&key);
        }
        Ok(check)
    }

    async fn remove_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct TestEmailService {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl TestEmailService {
    fn last_code(&self) -> String {
        self.sent
            .lock()
            .ok()
            .and_then(|sent| sent.last().cloned())
            .and_then(|(_, _, body)| {
                body.split("code is: ")
                    .nth(1)
                    .map(|rest| rest.chars().take_while(char::is_ascii_digit).collect())
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailService for TestEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        _html_body: Option<&str>,
    ) -> AppResult<()> {
        self.sent
            .lock()
            .map_err(|error| {
                AppError::Internal(format!("failed to lock email service state: {error}"))
            })?
            .push((to.to_owned(), subject.to_owned(), text_body.to_owned()));
        Ok(())
    }
}

fn service() -> (OtpService, Arc<TestEmailService>) {
    let email = Arc::new(TestEmailService::default());
    let service = OtpService::new(
        Arc::new(TestOtpRepo::default()),
        email.clone(),
        OtpSettings::default(),
    );
    (service, email)
}

#[tokio::test]
async fn issued_code_is_mailed_and_verifies_once() -> AppResult<()> {
    let (service, email) = service();

    service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await?;
    let code = email.last_code();
    assert_eq!(code.len(), 6);

    service
        .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &code)
        .await?;
    let reused = service
        .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &code)
        .await;
    assert!(matches!(reused, Err(AppError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn codes_are_scoped_to_their_purpose() -> AppResult<()> {
    let (service, email) = service();

    service
        .issue("ada@senselearn.io", OtpPurpose::PasswordReset)
        .await?;
    let code = email.last_code();

    let wrong_purpose = service
        .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &code)
        .await;
    assert!(wrong_purpose.is_err());
    service
        .verify("ada@senselearn.io", OtpPurpose::PasswordReset, &code)
        .await
}

#[tokio::test]
async fn new_code_replaces_the_previous_one() -> AppResult<()> {
    let (service, email) = service();

    service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await?;
    let first = email.last_code();
    service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await?;
    let second = email.last_code();

    if first != second {
        let stale = service
            .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &first)
            .await;
        assert!(stale.is_err());
    }
    service
        .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &second)
        .await
}

#[tokio::test]
async fn fifth_wrong_guess_invalidates_the_code() -> AppResult<()> {
    let (service, email) = service();

    service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await?;
    let code = email.last_code();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..5 {
        let result = service
            .verify("ada@senselearn.io", OtpPurpose::EmailVerification, wrong)
            .await;
        assert!(result.is_err());
    }

    let after = service
        .verify("ada@senselearn.io", OtpPurpose::EmailVerification, &code)
        .await;
    assert!(after.is_err());
    Ok(())
}

#[tokio::test]
async fn expired_code_is_rejected() -> AppResult<()> {
    let (service, email) = service();

    service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await?;
    let code = email.last_code();

    let result = service
        .verify_at(
            "ada@senselearn.io",
            OtpPurpose::EmailVerification,
            &code,
            Utc::now() + Duration::minutes(11),
        )
        .await;
    assert_eq!(
        result.err().map(|error| error.message().to_owned()),
        Some("Code has expired. Please request a new one.".to_owned())
    );
    Ok(())
}

#[tokio::test]
async fn out_of_range_validity_fails_before_mailing() {
    let email = Arc::new(TestEmailService::default());
    let service = OtpService::new(
        Arc::new(TestOtpRepo::default()),
        email.clone(),
        OtpSettings {
            validity_minutes: i64::MAX,
            ..OtpSettings::default()
        },
    );

    let result = service
        .issue("ada@senselearn.io", OtpPurpose::EmailVerification)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(email.last_code().is_empty());
}

#[test]
fn evaluation_counts_failures_until_exhausted() {
    let now = Utc::now();
    let mut record = OtpRecord {
        code_hash: "right".to_owned(),
        expires_at: now + Duration::minutes(1),
        failed_attempts: 0,
    };

    assert_eq!(record.evaluate("wrong", 2, now), OtpCheck::Invalid);
    assert_eq!(record.evaluate("wrong", 2, now), OtpCheck::Exhausted);
    assert!(OtpCheck::Exhausted.consumes_record());
    assert!(!OtpCheck::Invalid.consumes_record());
}
