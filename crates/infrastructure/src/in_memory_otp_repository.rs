use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use senselearn_application::{OtpCheck, OtpRecord, OtpRepository};
use senselearn_core::AppResult;
use senselearn_domain::OtpPurpose;
use tokio::sync::RwLock;

type OtpKey = (String, OtpPurpose);

/// Process-local store of hashed one-time codes, one per email and purpose.
#[derive(Default)]
pub struct InMemoryOtpRepository {
    records: RwLock<HashMap<OtpKey, OtpRecord>>,
}

impl InMemoryOtpRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn store(&self, email: &str, purpose: OtpPurpose, record: OtpRecord) -> AppResult<()> {
        self.records
            .write()
            .await
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
        let key = (email.to_owned(), purpose);
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&key) else {
            return Ok(OtpCheck::Missing);
        };

        let check = record.evaluate(code_hash, max_failed_attempts, now);
        if check.consumes_record() {
            records.remove(&key);
        }
        Ok(check)
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, record| record.expires_at > now);
        Ok(u64::try_from(initial - records.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(hash: &str, expires_at: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            code_hash: hash.to_owned(),
            expires_at,
            failed_attempts: 0,
        }
    }

    #[tokio::test]
    async fn valid_code_is_consumed() -> AppResult<()> {
        let repository = InMemoryOtpRepository::new();
        let now = Utc::now();
        repository
            .store(
                "ada@senselearn.io",
                OtpPurpose::EmailVerification,
                record("abc", now + Duration::minutes(10)),
            )
            .await?;

        let first = repository
            .verify("ada@senselearn.io", OtpPurpose::EmailVerification, "abc", 5, now)
            .await?;
        let second = repository
            .verify("ada@senselearn.io", OtpPurpose::EmailVerification, "abc", 5, now)
            .await?;
        assert_eq!(first, OtpCheck::Valid);
        assert_eq!(second, OtpCheck::Missing);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_guesses_keep_record_until_exhausted() -> AppResult<()> {
        let repository = InMemoryOtpRepository::new();
        let now = Utc::now();
        repository
            .store(
                "ada@senselearn.io",
                OtpPurpose::PasswordReset,
                record("abc", now + Duration::minutes(10)),
            )
            .await?;

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(
                repository
                    .verify("ada@senselearn.io", OtpPurpose::PasswordReset, "zzz", 3, now)
                    .await?,
            );
        }
        assert_eq!(
            outcomes,
            vec![OtpCheck::Invalid, OtpCheck::Invalid, OtpCheck::Exhausted]
        );
        assert_eq!(
            repository
                .verify("ada@senselearn.io", OtpPurpose::PasswordReset, "abc", 3, now)
                .await?,
            OtpCheck::Missing
        );
        Ok(())
    }

    #[tokio::test]
    async fn expired_records_are_swept() -> AppResult<()> {
        let repository = InMemoryOtpRepository::new();
        let now = Utc::now();
        repository
            .store(
                "old@senselearn.io",
                OtpPurpose::EmailVerification,
                record("a", now - Duration::minutes(1)),
            )
            .await?;
        repository
            .store(
                "new@senselearn.io",
                OtpPurpose::EmailVerification,
                record("b", now + Duration::minutes(1)),
            )
            .await?;

        assert_eq!(repository.remove_expired(now).await?, 1);
        Ok(())
    }
}
