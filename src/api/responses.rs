//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::TimerSnapshot;

/// Body of POST /timer/start; the default rest duration is used when omitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Body of POST /timer/adjust
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustRequest {
    pub seconds: i64,
}

/// Body of POST /timer/overlay
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayRequest {
    pub open: bool,
}

/// Body of PUT /settings/rest
#[derive(Debug, Clone, Deserialize)]
pub struct RestSettingRequest {
    pub seconds: u64,
}

/// API response structure for timer endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerSnapshot,
}

impl TimerResponse {
    pub fn new(status: &str, message: impl Into<String>, timer: TimerSnapshot) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            timer,
        }
    }

    /// The countdown is running
    pub fn running(message: impl Into<String>, timer: TimerSnapshot) -> Self {
        Self::new("running", message, timer)
    }

    /// The countdown is not running
    pub fn idle(message: impl Into<String>, timer: TimerSnapshot) -> Self {
        Self::new("idle", message, timer)
    }

    /// Pick `running` or `idle` from the snapshot itself
    pub fn current(message: impl Into<String>, timer: TimerSnapshot) -> Self {
        if timer.state.active {
            Self::running(message, timer)
        } else {
            Self::idle(message, timer)
        }
    }
}

/// Service status including the countdown
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub household: String,
    pub timer: TimerSnapshot,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Default rest duration after an update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestSettingResponse {
    pub seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Where the UI should navigate after a notification click
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationClickResponse {
    pub route: String,
}

/// Acknowledgement for fire-and-forget requests and health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
