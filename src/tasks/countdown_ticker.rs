//! Countdown ticker background task

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast::error::RecvError,
    time::{interval, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::{controller::TickOutcome, protocol::SchedulerEvent, state::AppState};

/// Drives the page's 1-second tick and reacts to scheduler completion broadcasts
pub async fn countdown_ticker_task(state: Arc<AppState>) {
    info!("Starting countdown ticker task");

    let mut events = state.scheduler.subscribe();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = state.controller.lock().await.tick().await;
                if outcome == TickOutcome::Completed {
                    state.record_action("complete");
                }
            }
            event = events.recv() => match event {
                Ok(SchedulerEvent::TimerDone) => {
                    let outcome = state.controller.lock().await.on_timer_done().await;
                    if outcome == TickOutcome::Completed {
                        state.record_action("complete");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Countdown ticker missed {} scheduler events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Scheduler event channel closed, stopping countdown ticker");
                    break;
                }
            }
        }
    }
}
