use chrono::TimeDelta;
use senselearn_core::{AppError, AppResult};

/// Longest window a rule may use: 30 days.
pub const MAX_WINDOW_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Configuration for a rate limit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// The route group name (e.g., "login", "password_reset").
    pub category: String,
    /// Maximum number of requests allowed in the window.
    pub max_attempts: u32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: u32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }

    /// Parses a rule from `"{max_attempts}/{window_seconds}"`, e.g. `"5/60"`.
    pub fn parse(category: impl Into<String>, value: &str) -> AppResult<Self> {
        let category = category.into();
        let invalid = || {
            AppError::Validation(format!(
                "invalid rate limit '{value}' for {category}, expected '<max>/<seconds>'"
            ))
        };

        let (max_attempts, window_seconds) = value.trim().split_once('/').ok_or_else(invalid)?;
        let max_attempts = max_attempts.trim().parse::<u32>().map_err(|_| invalid())?;
        let window_seconds = window_seconds.trim().parse::<i64>().map_err(|_| invalid())?;
        if !(1..=MAX_WINDOW_SECONDS).contains(&window_seconds) {
            return Err(AppError::Validation(format!(
                "rate limit window for {category} must be between 1 and {MAX_WINDOW_SECONDS} seconds"
            )));
        }

        Ok(Self {
            category,
            max_attempts,
            window_seconds,
        })
    }

    /// Returns the window as a duration, rejecting values chrono cannot hold.
    pub fn window(&self) -> AppResult<TimeDelta> {
        TimeDelta::try_seconds(self.window_seconds)
            .filter(|window| *window > TimeDelta::zero())
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "rate limit window for {} is out of range: {}s",
                    self.category, self.window_seconds
                ))
            })
    }

    /// Returns the store key for an identifier under this rule.
    #[must_use]
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{identifier}", self.category)
    }
}
