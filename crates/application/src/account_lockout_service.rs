//! Account lockout after repeated failed logins.
//!
//! State is keyed by canonical email so that unknown accounts are tracked
//! the same way as existing ones.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use senselearn_core::AppResult;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Repository port for lockout state.
///
/// Implementations must apply each transition inside one critical section.
#[async_trait]
pub trait LockoutRepository: Send + Sync {
    /// Returns the state for the key after expiring a lapsed lock.
    async fn load(&self, key: &str, now: DateTime<Utc>) -> AppResult<LockoutState>;

    /// Applies [`LockoutState::register_failure`] to the stored state and
    /// returns the result.
    async fn record_failure(
        &self,
        key: &str,
        policy: LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockoutState>;

    /// Forgets the state for the key.
    async fn clear(&self, key: &str) -> AppResult<()>;
}

/// Failed-login counters for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    /// Consecutive failures since the last success or lock expiry.
    pub failed_attempts: u32,
    /// Time of the last failure.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Account is locked until this time, if set.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Returns whether the lock is active at `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Resets the counters once a lock has lapsed.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        if self.locked_until.is_some_and(|until| now >= until) {
            *self = Self::default();
        }
    }

    /// Counts one failure and locks the account when the threshold is hit.
    /// Failures while locked do not extend the lock.
    pub fn register_failure(&mut self, policy: LockoutPolicy, now: DateTime<Utc>) {
        self.expire(now);
        if self.is_locked(now) {
            return;
        }

        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.last_attempt_at = Some(now);
        if self.failed_attempts >= policy.max_attempts {
            let until = Duration::try_seconds(policy.lockout_duration_seconds)
                .and_then(|duration| now.checked_add_signed(duration))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.locked_until = Some(until);
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Longest lock a policy may be configured with: seven days.
pub const MAX_LOCKOUT_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// Lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that trigger a lock.
    pub max_attempts: u32,
    /// Lock duration in seconds.
    pub lockout_duration_seconds: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration_seconds: 30 * 60,
        }
    }
}

/// Lockout view returned to callers and echoed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    /// Whether the account is currently locked.
    pub locked: bool,
    /// End of the active lock.
    pub locked_until: Option<DateTime<Utc>>,
    /// Consecutive failures counted so far.
    pub failed_attempts: u32,
    /// Configured threshold.
    pub max_attempts: u32,
    /// Failures left before the account locks.
    pub remaining_attempts: u32,
}

impl LockoutStatus {
    fn from_state(state: LockoutState, policy: LockoutPolicy, now: DateTime<Utc>) -> Self {
        let locked = state.is_locked(now);
        Self {
            locked,
            locked_until: state.locked_until.filter(|_| locked),
            failed_attempts: state.failed_attempts,
            max_attempts: policy.max_attempts,
            remaining_attempts: if locked {
                0
            } else {
                policy.max_attempts.saturating_sub(state.failed_attempts)
            },
        }
    }

    /// Whole seconds until the lock ends, rounded up; zero when unlocked.
    #[must_use]
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> i64 {
        let Some(until) = self.locked_until else {
            return 0;
        };
        let millis = (until - now).num_milliseconds();
        if millis <= 0 { 0 } else { (millis + 999) / 1000 }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for account lockout.
#[derive(Clone)]
pub struct AccountLockoutService {
    repository: Arc<dyn LockoutRepository>,
    policy: LockoutPolicy,
}

impl AccountLockoutService {
    /// Creates a new lockout service.
    #[must_use]
    pub fn new(repository: Arc<dyn LockoutRepository>, policy: LockoutPolicy) -> Self {
        Self { repository, policy }
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Returns the lockout status for an account.
    pub async fn status(&self, email: &str) -> AppResult<LockoutStatus> {
        self.status_at(email, Utc::now()).await
    }

    /// Returns the lockout status as of `now`.
    pub async fn status_at(&self, email: &str, now: DateTime<Utc>) -> AppResult<LockoutStatus> {
        let state = self.repository.load(&lockout_key(email), now).await?;
        Ok(LockoutStatus::from_state(state, self.policy, now))
    }

    /// Counts a failed login.
    pub async fn record_failure(&self, email: &str) -> AppResult<LockoutStatus> {
        self.record_failure_at(email, Utc::now()).await
    }

    /// Counts a failed login that happened at `now`.
    pub async fn record_failure_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LockoutStatus> {
        let state = self
            .repository
            .record_failure(&lockout_key(email), self.policy, now)
            .await?;
        Ok(LockoutStatus::from_state(state, self.policy, now))
    }

    /// Clears the counters after a successful login.
    pub async fn record_success(&self, email: &str) -> AppResult<()> {
        self.reset(email).await
    }

    /// Clears the counters and any active lock.
    pub async fn reset(&self, email: &str) -> AppResult<()> {
        self.repository.clear(&lockout_key(email)).await
    }
}

fn lockout_key(email: &str) -> String {
    email.trim().to_lowercase()
}
