//! State management module
//!
//! Countdown state projected to the page, plus the shared application state
//! handed to HTTP handlers and background tasks.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use timer_state::{format_time, time_left_secs, TimerPhase, TimerState};
