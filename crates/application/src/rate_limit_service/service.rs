use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use senselearn_core::{AppError, AppResult};

use super::config::RateLimitRule;
use super::ports::RateLimitRepository;

/// Outcome of a rate limit check, carrying the values for `X-RateLimit-*`
/// response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Configured maximum for the window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the oldest counted request leaves the window.
    pub reset_at: DateTime<Utc>,
    /// Seconds until another request is accepted; zero when allowed.
    pub retry_after_seconds: i64,
}

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Checks and counts a request from `identifier` against the rule.
    pub async fn check(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> AppResult<RateLimitDecision> {
        self.check_at(rule, identifier, Utc::now()).await
    }

    /// Checks and counts a request as if it arrived at `now`.
    pub async fn check_at(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let window = rule.window()?;
        let info = self
            .repository
            .record_attempt(
                &rule.key_for(identifier),
                rule.max_attempts,
                rule.window_seconds,
                now,
            )
            .await?;

        let reset_at = info
            .oldest_attempt_at
            .unwrap_or(now)
            .checked_add_signed(window)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "rate limit window for {} is out of range",
                    rule.category
                ))
            })?;

        if info.recorded {
            return Ok(RateLimitDecision {
                allowed: true,
                limit: rule.max_attempts,
                remaining: rule.max_attempts.saturating_sub(info.attempt_count),
                reset_at,
                retry_after_seconds: 0,
            });
        }

        Ok(RateLimitDecision {
            allowed: false,
            limit: rule.max_attempts,
            remaining: 0,
            reset_at,
            retry_after_seconds: ceil_seconds(reset_at - now).max(1),
        })
    }

    /// Clears the window for `identifier` under the rule.
    pub async fn reset(&self, rule: &RateLimitRule, identifier: &str) -> AppResult<()> {
        self.repository.clear(&rule.key_for(identifier)).await
    }

    /// Removes keys whose every hit has left the longest window among
    /// `rules`. Intended for periodic cleanup.
    pub async fn cleanup(&self, rules: &[&RateLimitRule]) -> AppResult<u64> {
        self.cleanup_at(rules, Utc::now()).await
    }

    /// Runs [`Self::cleanup`] as if it happened at `now`.
    pub async fn cleanup_at(
        &self,
        rules: &[&RateLimitRule],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut longest: Option<Duration> = None;
        for rule in rules {
            let window = rule.window()?;
            longest = Some(longest.map_or(window, |current| current.max(window)));
        }
        // Without a rule there is no window to measure keys against.
        let Some(longest) = longest else {
            return Ok(0);
        };

        let cutoff = now.checked_sub_signed(longest).ok_or_else(|| {
            AppError::Validation("rate limit cleanup cutoff is out of range".to_owned())
        })?;
        self.repository.cleanup_expired(cutoff).await
    }
}

fn ceil_seconds(duration: Duration) -> i64 {
    let millis = duration.num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + 999) / 1000
}
