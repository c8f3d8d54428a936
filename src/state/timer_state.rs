//! Timer state structure and countdown arithmetic

use serde::{Deserialize, Serialize};

/// Phase of the foreground countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    /// The countdown reached zero and the completion cue is playing.
    /// Internal to the controller: it is back to `Idle` before the lock is
    /// released, so snapshots never report it.
    Ringing,
}

/// UI projection of the countdown, per page instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub active: bool,
    /// Seconds left, always re-derived from the absolute expiry while running
    pub time_left: u64,
    /// Target duration in seconds
    pub duration: u64,
    /// Whether the timer overlay is shown
    pub is_open: bool,
}

impl TimerState {
    /// Create an inactive timer state
    pub fn new(duration: u64) -> Self {
        Self {
            active: false,
            time_left: 0,
            duration,
            is_open: false,
        }
    }

    /// Progress towards the target, clamped to 0..=100
    pub fn progress_percent(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        let elapsed = self.duration as f64 - self.time_left as f64;
        (elapsed / self.duration as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Remaining time as `m:ss`
    pub fn display(&self) -> String {
        format_time(self.time_left)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Whole seconds left until `expires_at_ms`, rounded to nearest, never negative
pub fn time_left_secs(expires_at_ms: i64, now_ms: i64) -> u64 {
    let remaining = expires_at_ms.saturating_sub(now_ms);
    if remaining <= 0 {
        0
    } else {
        ((remaining + 500) / 1000) as u64
    }
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: u64) -> String {
    if seconds == 0 {
        return "0:00".to_string();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
