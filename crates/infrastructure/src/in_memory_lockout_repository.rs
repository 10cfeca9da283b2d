use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use senselearn_application::{LockoutPolicy, LockoutRepository, LockoutState};
use senselearn_core::AppResult;
use tokio::sync::RwLock;

/// Process-local lockout counters keyed by canonical email.
#[derive(Default)]
pub struct InMemoryLockoutRepository {
    states: RwLock<HashMap<String, LockoutState>>,
}

impl InMemoryLockoutRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockoutRepository for InMemoryLockoutRepository {
    async fn load(&self, key: &str, now: DateTime<Utc>) -> AppResult<LockoutState> {
        {
            let states = self.states.read().await;
            match states.get(key) {
                None => return Ok(LockoutState::default()),
                Some(state) if !state.locked_until.is_some_and(|until| now >= until) => {
                    return Ok(*state);
                }
                Some(_) => {}
            }
        }

        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(key) else {
            return Ok(LockoutState::default());
        };
        state.expire(now);
        let current = *state;
        if current == LockoutState::default() {
            states.remove(key);
        }
        Ok(current)
    }

    async fn record_failure(
        &self,
        key: &str,
        policy: LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockoutState> {
        let mut states = self.states.write().await;
        let state = states.entry(key.to_owned()).or_default();
        state.register_failure(policy, now);
        Ok(*state)
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.states.write().await.remove(key);
        Ok(())
    }
}
