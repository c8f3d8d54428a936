//! Background tasks module
//!
//! The scheduler runs independently of any page; the other tasks drive the
//! page's countdown and give the scheduler its wake-ups.

pub mod background_scheduler;
pub mod countdown_ticker;
pub mod store_refresh;
pub mod wake_up_recovery;

// Re-export main types and functions
pub use background_scheduler::{
    spawn_background_scheduler, BackgroundScheduler, CheckOutcome, SchedulerHandle,
    SchedulerPhase, MAX_INTERVAL,
};
pub use countdown_ticker::countdown_ticker_task;
pub use store_refresh::store_refresh_task;
pub use wake_up_recovery::wake_up_recovery_task;
