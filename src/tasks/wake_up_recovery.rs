//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use tokio::time::interval;
use tracing::{debug, info};

use crate::state::AppState;

/// Periodically wakes the background scheduler so it re-reads its cache.
///
/// Stands in for the platform reviving a suspended worker for unrelated
/// reasons; page loads wake the scheduler the same way.
pub async fn wake_up_recovery_task(state: Arc<AppState>, period: Duration) {
    info!("Starting wake-up recovery task (every {}s)", period.as_secs());

    let mut interval = interval(period);

    loop {
        interval.tick().await;
        debug!("Sending periodic wake to scheduler");
        state.wake_scheduler();
    }
}
