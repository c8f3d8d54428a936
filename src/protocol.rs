//! Messages exchanged between the countdown controller and the background scheduler

use serde::{Deserialize, Serialize};

/// Commands accepted by the background scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerCommand {
    /// Arm a new countdown, superseding any existing one
    StartTimer {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    /// Disarm immediately
    CancelTimer,
    /// The hosting context was revived; run missed-expiry recovery
    Wake,
}

/// Events broadcast by the background scheduler to every live controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerEvent {
    TimerDone,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_use_wire_names() {
        let start = serde_json::to_value(SchedulerCommand::StartTimer { delay_ms: 90_000 }).unwrap();
        assert_eq!(start, json!({"type": "START_TIMER", "delayMs": 90000}));

        let cancel = serde_json::to_value(SchedulerCommand::CancelTimer).unwrap();
        assert_eq!(cancel, json!({"type": "CANCEL_TIMER"}));

        let done = serde_json::to_value(SchedulerEvent::TimerDone).unwrap();
        assert_eq!(done, json!({"type": "TIMER_DONE"}));
    }

    #[test]
    fn start_command_parses_from_wire() {
        let cmd: SchedulerCommand =
            serde_json::from_str(r#"{"type":"START_TIMER","delayMs":1500}"#).unwrap();
        assert_eq!(cmd, SchedulerCommand::StartTimer { delay_ms: 1500 });
    }
}
