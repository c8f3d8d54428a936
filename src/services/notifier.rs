//! Completion notification capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Collapsing tag shared by every rest-timer notification, so a newer one
/// replaces any earlier undismissed one
pub const NOTIFICATION_TAG: &str = "rest-timer";

/// Payload for a human-visible completion signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag: NOTIFICATION_TAG.to_string(),
        }
    }

    /// Sent by the scheduler when an armed timer runs out
    pub fn rest_complete() -> Self {
        Self::new("Rest Complete! 💪", "Time to crush the next set")
    }

    /// Sent when a wake finds a timer that expired while nothing was running
    pub fn missed_rest_complete() -> Self {
        Self::new("Rest Complete! 💪", "Your rest period is over")
    }

    /// Foreground signal raised by the countdown itself
    pub fn foreground_complete() -> Self {
        Self::new("Rest Complete!", "")
    }
}

/// Something able to show a notification to the user.
///
/// Implementations may fail (permission denied, no display); callers go
/// through [`deliver`], which never propagates the failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), String>;
}

/// Deliver a notification, logging and swallowing any failure
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    match notifier.notify(notification).await {
        Ok(()) => debug!("Delivered notification '{}'", notification.title),
        Err(e) => warn!("Notification delivery failed: {}", e),
    }
}

/// Used where no notification surface exists
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), String> {
        Ok(())
    }
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        info!(tag = %notification.tag, "{} {}", notification.title, notification.body);
        Ok(())
    }
}

/// Shows notifications through a `notify-send` compatible command
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(notification: &Notification) -> Vec<String> {
        vec![
            "--app-name".to_string(),
            "rest-timer".to_string(),
            // Replaces an earlier notification carrying the same tag
            "--hint".to_string(),
            format!("string:x-canonical-private-synchronous:{}", notification.tag),
            notification.title.clone(),
            notification.body.clone(),
        ]
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        let output = Command::new(&self.program)
            .args(Self::args(notification))
            .output()
            .await
            .map_err(|e| format!("Failed to execute {}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} failed: {}", self.program, stderr));
        }

        Ok(())
    }
}
