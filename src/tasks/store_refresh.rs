//! Shared store refresh background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

/// Re-reads the household expiry and reconciles the countdown against it,
/// so timers started or cancelled on other devices show up here
pub async fn store_refresh_task(state: Arc<AppState>, period: Duration) {
    info!("Starting shared store refresh task (every {}s)", period.as_secs());

    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let timer = state.controller.lock().await.refresh().await;
        debug!("Refreshed shared timer state: active={}, time_left={}", timer.active, timer.time_left);
    }
}
