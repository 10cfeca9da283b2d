use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::AppState;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically drops lapsed rate-limit windows and expired one-time codes.
pub fn spawn_cleanup_task(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&state).await;
        }
    })
}

async fn run_cleanup(state: &AppState) {
    match state
        .rate_limit_service
        .cleanup(&state.rate_limits.all())
        .await
    {
        Ok(removed) => debug!(removed, "rate limit windows cleaned up"),
        Err(error) => warn!(%error, "rate limit cleanup failed"),
    }

    match state.otp_service.cleanup().await {
        Ok(removed) => debug!(removed, "expired one-time codes cleaned up"),
        Err(error) => warn!(%error, "one-time code cleanup failed"),
    }
}
