use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use senselearn_application::{AttemptInfo, RateLimitRepository};
use senselearn_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// Process-local sliding-window log of accepted requests per key.
#[derive(Default)]
pub struct InMemoryRateLimitRepository {
    windows: RwLock<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn count(window: &VecDeque<DateTime<Utc>>) -> u32 {
    u32::try_from(window.len()).unwrap_or(u32::MAX)
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo> {
        let window_start = Duration::try_seconds(window_seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::Validation(format!("rate limit window out of range: {window_seconds}s"))
            })?;

        let mut windows = self.windows.write().await;
        let window = windows.entry(key.to_owned()).or_default();
        while window.front().is_some_and(|hit| *hit <= window_start) {
            window.pop_front();
        }

        let recorded = count(window) < max_attempts;
        if recorded {
            window.push_back(now);
        }

        Ok(AttemptInfo {
            attempt_count: count(window),
            recorded,
            oldest_attempt_at: window.front().copied(),
        })
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.windows.write().await.remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.windows.write().await;
        let initial = windows.len();
        windows.retain(|_, window| window.back().is_some_and(|latest| *latest >= before));
        Ok(u64::try_from(initial - windows.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn rejected_hits_are_not_recorded() -> AppResult<()> {
        let repository = InMemoryRateLimitRepository::new();

        for second in 0..3 {
            repository
                .record_attempt("login:ip", 2, 60, start() + Duration::seconds(second))
                .await?;
        }

        let info = repository
            .record_attempt("login:ip", 2, 60, start() + Duration::seconds(60))
            .await?;
        assert!(info.recorded);
        assert_eq!(info.attempt_count, 2);
        assert_eq!(info.oldest_attempt_at, Some(start() + Duration::seconds(1)));
        Ok(())
    }

    #[tokio::test]
    async fn cleanup_drops_idle_keys_only() -> AppResult<()> {
        let repository = InMemoryRateLimitRepository::new();
        repository.record_attempt("login:old", 5, 60, start()).await?;
        repository
            .record_attempt("login:new", 5, 60, start() + Duration::hours(2))
            .await?;

        let removed = repository
            .cleanup_expired(start() + Duration::hours(1))
            .await?;
        assert_eq!(removed, 1);

        let info = repository
            .record_attempt("login:new", 5, 60, start() + Duration::hours(2))
            .await?;
        assert_eq!(info.attempt_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_window_is_an_error_not_a_panic() {
        let repository = InMemoryRateLimitRepository::new();

        let result = repository
            .record_attempt("login:ip", 5, i64::MAX, start())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn concurrent_hits_never_exceed_the_limit() -> AppResult<()> {
        let repository = std::sync::Arc::new(InMemoryRateLimitRepository::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let repository = repository.clone();
            handles.push(tokio::spawn(async move {
                repository
                    .record_attempt("register:ip", 5, 3600, start())
                    .await
            }));
        }

        let mut recorded = 0;
        for handle in handles {
            let info = handle
                .await
                .map_err(|error| AppError::Internal(error.to_string()))??;
            if info.recorded {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 5);
        Ok(())
    }
}
