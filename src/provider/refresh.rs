//! Auto-refresh: background task that keeps the stored session fresh.
//!
//! DESIGN
//! ======
//! A ticker wakes every `interval` and asks the client to refresh if the
//! stored session is inside the refresh margin. Successful refreshes reach
//! the session store as `TOKEN_REFRESHED` events; a rejected refresh token
//! reaches it as `SIGNED_OUT`. Transient failures are logged and retried
//! on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::gotrue::GoTrueClient;
use crate::config::env_parse;

pub const DEFAULT_AUTO_REFRESH_SECS: u64 = 30;

/// Read `AUTH_AUTO_REFRESH_SECS` (default 30, `0` disables auto-refresh).
#[must_use]
pub fn interval_from_env() -> Option<Duration> {
    let secs = env_parse("AUTH_AUTO_REFRESH_SECS", DEFAULT_AUTO_REFRESH_SECS);
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Spawn the auto-refresh task. Returns a handle for shutdown.
pub fn spawn_auto_refresh(client: Arc<GoTrueClient>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "session auto-refresh configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match client.refresh_if_expiring().await {
                Ok(true) => debug!("auto-refresh renewed session"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "auto-refresh failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
