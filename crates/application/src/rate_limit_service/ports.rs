use async_trait::async_trait;
use chrono::{DateTime, Utc};

use senselearn_core::AppResult;

/// Repository port for rate limit state.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Prunes timestamps older than `now - window_seconds` for the key, then
    /// records `now` if fewer than `max_attempts` remain.
    ///
    /// Pruning, counting and recording happen in one critical section.
    async fn record_attempt(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo>;

    /// Forgets every timestamp recorded for the key.
    async fn clear(&self, key: &str) -> AppResult<()>;

    /// Removes keys with no timestamp at or after the cutoff. Returns the
    /// number of keys removed.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Window snapshot for a key after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Number of timestamps in the window (including this one when recorded).
    pub attempt_count: u32,
    /// Whether this attempt was accepted and recorded.
    pub recorded: bool,
    /// Oldest timestamp still inside the window.
    pub oldest_attempt_at: Option<DateTime<Utc>>,
}
