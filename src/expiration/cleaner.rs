use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::AppState;

/// Start the background task that drops stale session-validation entries.
///
/// Stale entries are never served either way; sweeping only keeps memory
/// proportional to recent traffic.
pub fn start_cache_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.auth.cache_sweep_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_sweep(&state);
        }
    })
}

fn run_sweep(state: &AppState) {
    let purged = state.gate.sessions().purge_stale();
    if purged > 0 {
        debug!(
            purged,
            remaining = state.gate.sessions().len(),
            "Stale session validations purged"
        );
    }
}
