use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::engine::lifecycle::AssignmentLifecycleManager;

/// Runs the expiry sweep on a fixed interval. A slow run delays the next tick
/// instead of stacking runs on top of each other.
pub async fn run_expiry_sweeper(lifecycle: Arc<AssignmentLifecycleManager>, every: Duration) {
    info!(interval_secs = every.as_secs(), "expiry sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(err) = lifecycle.sweep_expired(Utc::now()).await {
            error!(error = %err, "expiry sweep failed");
        }
    }
}
