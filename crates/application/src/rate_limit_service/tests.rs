use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use senselearn_core::{AppError, AppResult};

use super::{
    AttemptInfo, MAX_WINDOW_SECONDS, RateLimitRepository, RateLimitRule, RateLimitService,
};

#[derive(Default)]
struct TestRateLimitRepo {
    hits: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

#[async_trait]
impl RateLimitRepository for TestRateLimitRepo {
    async fn record_attempt(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo> {
        let mut hits = self
            .hits
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?;
        let entry = hits.entry(key.to_owned()).or_default();
        let window_start = now - Duration::seconds(window_seconds);
        entry.retain(|hit| *hit > window_start);

        let recorded = u32::try_from(entry.len()).unwrap_or(u32::MAX) < max_attempts;
        if recorded {
            entry.push(now);
        }

        Ok(AttemptInfo {
            attempt_count: u32::try_from(entry.len()).unwrap_or(u32::MAX),
            recorded,
            oldest_attempt_at: entry.first().copied(),
        })
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.hits
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?
            .remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut hits = self
            .hits
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?;
        let initial = hits.len();
        hits.retain(|_, entry| entry.last().is_some_and(|latest| *latest >= before));
        Ok(u64::try_from(initial - hits.len()).unwrap_or(u64::MAX))
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn service() -> RateLimitService {
    RateLimitService::new(Arc::new(TestRateLimitRepo::default()))
}

#[tokio::test]
async fn sixth_request_in_window_is_rejected() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::new("login", 5, 60);

    for attempt in 0..5 {
        let decision = service
            .check_at(&rule, "198.51.100.7", start() + Duration::seconds(attempt))
            .await?;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4 - u32::try_from(attempt).unwrap_or(0));
    }

    let rejected = service
        .check_at(&rule, "198.51.100.7", start() + Duration::seconds(10))
        .await?;
    assert!(!rejected.allowed);
    assert_eq!(rejected.remaining, 0);
    assert_eq!(rejected.reset_at, start() + Duration::seconds(60));
    assert_eq!(rejected.retry_after_seconds, 50);
    Ok(())
}

#[tokio::test]
async fn window_slides_after_oldest_request_expires() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::new("login", 2, 60);

    service.check_at(&rule, "ip", start()).await?;
    service
        .check_at(&rule, "ip", start() + Duration::seconds(30))
        .await?;
    let blocked = service
        .check_at(&rule, "ip", start() + Duration::seconds(59))
        .await?;
    assert!(!blocked.allowed);
    assert_eq!(blocked.retry_after_seconds, 1);

    let allowed = service
        .check_at(&rule, "ip", start() + Duration::seconds(61))
        .await?;
    assert!(allowed.allowed);
    assert_eq!(allowed.remaining, 0);
    assert_eq!(allowed.reset_at, start() + Duration::seconds(90));
    Ok(())
}

#[tokio::test]
async fn keys_are_isolated_by_category_and_identifier() -> AppResult<()> {
    let service = service();
    let login = RateLimitRule::new("login", 1, 60);
    let register = RateLimitRule::new("register", 1, 60);

    assert!(service.check_at(&login, "a", start()).await?.allowed);
    assert!(service.check_at(&login, "b", start()).await?.allowed);
    assert!(service.check_at(&register, "a", start()).await?.allowed);
    assert!(!service.check_at(&login, "a", start()).await?.allowed);
    Ok(())
}

#[tokio::test]
async fn reset_clears_the_window() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::new("otp", 1, 3600);

    service.check_at(&rule, "ip", start()).await?;
    service.reset(&rule, "ip").await?;
    assert!(service.check_at(&rule, "ip", start()).await?.allowed);
    Ok(())
}

#[tokio::test]
async fn zero_limit_rejects_with_full_window() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::new("closed", 0, 60);

    let decision = service.check_at(&rule, "ip", start()).await?;
    assert!(!decision.allowed);
    assert_eq!(decision.retry_after_seconds, 60);
    Ok(())
}

#[tokio::test]
async fn cleanup_keeps_windows_longer_than_an_hour() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::parse("register", "2/86400")?;

    service.check_at(&rule, "ip", start()).await?;
    service
        .check_at(&rule, "ip", start() + Duration::minutes(1))
        .await?;
    let later = start() + Duration::hours(2);
    assert!(!service.check_at(&rule, "ip", later).await?.allowed);

    let removed = service.cleanup_at(&[&rule], later).await?;
    assert_eq!(removed, 0);

    let after_cleanup = service.check_at(&rule, "ip", later).await?;
    assert!(!after_cleanup.allowed);
    assert_eq!(after_cleanup.reset_at, start() + Duration::hours(24));
    Ok(())
}

#[tokio::test]
async fn cleanup_drops_keys_past_the_longest_window() -> AppResult<()> {
    let service = service();
    let login = RateLimitRule::new("login", 5, 60);
    let otp = RateLimitRule::new("otp", 10, 3600);

    service.check_at(&login, "stale", start()).await?;
    service
        .check_at(&login, "fresh", start() + Duration::minutes(30))
        .await?;

    let removed = service
        .cleanup_at(&[&login, &otp], start() + Duration::minutes(70))
        .await?;
    assert_eq!(removed, 1);

    let fresh = service
        .check_at(&login, "fresh", start() + Duration::minutes(30))
        .await?;
    assert_eq!(fresh.remaining, 3);
    Ok(())
}

#[tokio::test]
async fn cleanup_without_rules_removes_nothing() -> AppResult<()> {
    let service = service();
    let rule = RateLimitRule::new("login", 5, 60);
    service.check_at(&rule, "ip", start()).await?;

    let removed = service
        .cleanup_at(&[], start() + Duration::days(30))
        .await?;
    assert_eq!(removed, 0);
    Ok(())
}

#[tokio::test]
async fn out_of_range_window_is_rejected_without_panicking() {
    let service = service();
    let rule = RateLimitRule::new("login", 5, i64::MAX);

    let result = service.check_at(&rule, "ip", start()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let cleanup = service.cleanup_at(&[&rule], start()).await;
    assert!(matches!(cleanup, Err(AppError::Validation(_))));
}

#[test]
fn rule_parses_max_and_window() {
    assert_eq!(
        RateLimitRule::parse("login", " 5/60 ").ok(),
        Some(RateLimitRule::new("login", 5, 60))
    );
    assert!(RateLimitRule::parse("login", "5").is_err());
    assert!(RateLimitRule::parse("login", "five/60").is_err());
    assert!(RateLimitRule::parse("login", "5/0").is_err());
    assert!(RateLimitRule::parse("login", "5/9223372036854775807").is_err());
    assert!(RateLimitRule::parse("login", &format!("5/{}", MAX_WINDOW_SECONDS + 1)).is_err());
    assert!(RateLimitRule::parse("login", &format!("5/{MAX_WINDOW_SECONDS}")).is_ok());
}
