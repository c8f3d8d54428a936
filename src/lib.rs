//! Rest Timer - keeps one rest countdown consistent across a household's devices
//!
//! A foreground countdown controller and an independent background scheduler
//! cooperate over channels. The scheduler persists absolute end times and
//! never waits more than a bounded interval, so completion is signalled even
//! when the process that armed the timer is suspended or restarted.

pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod protocol;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::Config;
pub use controller::{
    ControllerError, CountdownController, TickOutcome, TimerSnapshot, MAX_DURATION_SECS,
};
pub use protocol::{SchedulerCommand, SchedulerEvent};
pub use state::{AppState, TimerPhase, TimerState};
pub use tasks::{spawn_background_scheduler, BackgroundScheduler, SchedulerHandle, MAX_INTERVAL};
pub use utils::signals::shutdown_signal;
