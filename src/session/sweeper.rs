//! Periodic idle-eviction background task.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use super::SessionStore;

/// Spawn a task that evicts sessions idle for `idle_timeout`, checking every
/// `interval`. Abort the returned handle to stop it.
pub fn spawn_eviction_sweeper(
    store: Arc<SessionStore>,
    interval: Duration,
    idle_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(idle_timeout).await;
            if !evicted.is_empty() {
                info!(
                    "Idle sweep evicted {} session(s); {} remain",
                    evicted.len(),
                    store.len()
                );
            }
        }
    })
}
