//! Countdown controller
//!
//! Foreground state machine behind the timer page. It owns the visible
//! countdown, publishes expiries to the household store and commands the
//! background scheduler. It never calls into the scheduler directly; the two
//! sides only exchange messages.
//!
//! Remote writes are best effort. A failed store write is logged and the
//! local countdown carries on; the next reconcile repairs any divergence.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    clock::SharedClock,
    protocol::SchedulerCommand,
    services::{
        chime::{ring, Chime, NullChime},
        notifier::{deliver, Notification, Notifier, NullNotifier},
    },
    state::{time_left_secs, TimerPhase, TimerState},
    storage::SharedExpiryStore,
    tasks::SchedulerHandle,
};

/// Longest countdown accepted, in seconds. Adjustments clamp to it.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("rest duration must be greater than zero")]
    ZeroDuration,
    #[error("rest duration must be at most one day")]
    DurationTooLong,
    #[error("no paused timer to resume")]
    NotPaused,
}

/// What a tick observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Counting(u64),
    Completed,
}

/// Serializable view of the countdown for the page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    #[serde(flatten)]
    pub state: TimerState,
    pub expires_at: Option<DateTime<Utc>>,
    pub display: String,
    pub progress: f64,
    pub default_duration: u64,
}

pub struct CountdownController {
    household_id: String,
    clock: SharedClock,
    store: SharedExpiryStore,
    scheduler: SchedulerHandle,
    chime: Arc<dyn Chime>,
    notifier: Arc<dyn Notifier>,
    default_duration: u64,
    phase: TimerPhase,
    state: TimerState,
    expires_at: Option<i64>,
}

impl CountdownController {
    pub fn new(
        household_id: impl Into<String>,
        default_duration: u64,
        clock: SharedClock,
        store: SharedExpiryStore,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            household_id: household_id.into(),
            clock,
            store,
            scheduler,
            chime: Arc::new(NullChime),
            notifier: Arc::new(NullNotifier),
            default_duration,
            phase: TimerPhase::Idle,
            state: TimerState::new(default_duration),
            expires_at: None,
        }
    }

    /// Attach the local completion signals
    pub fn with_signals(mut self, chime: Arc<dyn Chime>, notifier: Arc<dyn Notifier>) -> Self {
        self.chime = chime;
        self.notifier = notifier;
        self
    }

    pub fn household_id(&self) -> &str {
        &self.household_id
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn default_duration(&self) -> u64 {
        self.default_duration
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            state: self.state,
            expires_at: self.expires_at.and_then(DateTime::<Utc>::from_timestamp_millis),
            display: self.state.display(),
            progress: self.state.progress_percent(),
            default_duration: self.default_duration,
        }
    }

    /// Start (or restart) the countdown for `duration` seconds
    pub async fn start(&mut self, duration: u64) -> Result<TimerState, ControllerError> {
        validate_duration(duration)?;
        if self.phase == TimerPhase::Running {
            debug!("Restarting running timer");
        }

        let expires_at = self.clock.now_ms().saturating_add(secs_to_ms(duration));
        self.run_until(expires_at, duration, duration);
        info!("Rest timer started for {}s", duration);

        self.scheduler.send(SchedulerCommand::StartTimer {
            delay_ms: secs_to_ms(duration) as u64,
        });
        self.publish(Some(expires_at)).await;
        Ok(self.state)
    }

    /// One cooperative tick. Time left is recomputed from the expiry, so a
    /// throttled page catches up instead of drifting.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Idle;
        }
        let Some(expires_at) = self.expires_at else {
            self.go_idle();
            return TickOutcome::Idle;
        };

        let left = time_left_secs(expires_at, self.clock.now_ms());
        self.state.time_left = left;
        if left > 0 {
            return TickOutcome::Counting(left);
        }

        self.complete().await;
        TickOutcome::Completed
    }

    /// Handle a `TIMER_DONE` broadcast from the scheduler
    pub async fn on_timer_done(&mut self) -> TickOutcome {
        debug!("Scheduler reported TIMER_DONE");
        // A stale broadcast for a superseded timer only refreshes time_left
        self.tick().await
    }

    /// Stop the countdown. Cancelling while idle does nothing.
    pub async fn cancel(&mut self) -> TimerState {
        if self.phase == TimerPhase::Idle {
            debug!("Cancel ignored, no timer running");
            return self.state;
        }

        let previous = self.phase;
        self.go_idle();
        self.publish(None).await;
        self.scheduler.send(SchedulerCommand::CancelTimer);
        info!("Rest timer cancelled (was {:?})", previous);
        self.state
    }

    /// Adopt the household's expiry as read from the shared store
    pub fn reconcile(&mut self, remote_expires_at: Option<i64>) -> TimerState {
        let now = self.clock.now_ms();
        match remote_expires_at {
            Some(at) if at > now => {
                let left = time_left_secs(at, now);
                if self.phase == TimerPhase::Running && self.expires_at == Some(at) {
                    self.state.time_left = left;
                    return self.state;
                }

                info!("Adopting rest timer expiring at {} ({}s left)", at, left);
                let duration = self.default_duration.max(left);
                self.run_until(at, left, duration);
                self.scheduler.send(SchedulerCommand::StartTimer {
                    delay_ms: (at - now) as u64,
                });
            }
            _ => {
                if self.phase == TimerPhase::Running {
                    let still_pending = self.expires_at.is_some_and(|at| at > now);
                    self.go_idle();
                    if still_pending {
                        info!("Rest timer was cleared on another device");
                        self.scheduler.send(SchedulerCommand::CancelTimer);
                    }
                }
            }
        }
        self.state
    }

    /// Re-read the shared store and reconcile against it
    pub async fn refresh(&mut self) -> TimerState {
        match self.store.get(&self.household_id).await {
            Ok(remote) => self.reconcile(remote),
            Err(e) => {
                warn!("Failed to read shared timer state: {}", e);
                self.state
            }
        }
    }

    /// Freeze the countdown, keeping the remaining seconds locally
    pub async fn pause(&mut self) -> TimerState {
        if self.phase != TimerPhase::Running {
            return self.state;
        }
        let Some(expires_at) = self.expires_at else {
            return self.state;
        };

        let left = time_left_secs(expires_at, self.clock.now_ms());
        if left == 0 {
            self.complete().await;
            return self.state;
        }

        self.expires_at = None;
        self.phase = TimerPhase::Paused;
        self.state.active = false;
        self.state.time_left = left;
        info!("Rest timer paused with {}s left", left);

        self.scheduler.send(SchedulerCommand::CancelTimer);
        self.publish(None).await;
        self.state
    }

    pub async fn resume(&mut self) -> Result<TimerState, ControllerError> {
        if self.phase != TimerPhase::Paused {
            return Err(ControllerError::NotPaused);
        }

        let left = self.state.time_left;
        if left == 0 {
            self.complete().await;
            return Ok(self.state);
        }

        let expires_at = self.clock.now_ms().saturating_add(secs_to_ms(left));
        self.run_until(expires_at, left, self.state.duration);
        info!("Rest timer resumed with {}s left", left);

        self.scheduler.send(SchedulerCommand::StartTimer {
            delay_ms: secs_to_ms(left) as u64,
        });
        self.publish(Some(expires_at)).await;
        Ok(self.state)
    }

    /// Shift the remaining time by `delta_secs` (negative shortens)
    pub async fn adjust(&mut self, delta_secs: i64) -> TimerState {
        match self.phase {
            TimerPhase::Running => {
                let Some(expires_at) = self.expires_at else {
                    return self.state;
                };
                let now = self.clock.now_ms();
                let shifted = expires_at
                    .saturating_add(delta_secs.saturating_mul(1000))
                    .min(now.saturating_add(secs_to_ms(MAX_DURATION_SECS)));
                let left = time_left_secs(shifted, now);

                if left == 0 {
                    self.scheduler.send(SchedulerCommand::CancelTimer);
                    self.complete().await;
                    return self.state;
                }

                self.expires_at = Some(shifted);
                self.state.time_left = left;
                debug!("Rest timer adjusted by {}s, {}s left", delta_secs, left);

                self.scheduler.send(SchedulerCommand::StartTimer {
                    delay_ms: (shifted - now) as u64,
                });
                self.publish(Some(shifted)).await;
            }
            TimerPhase::Paused => {
                let left = i64::try_from(self.state.time_left)
                    .unwrap_or(i64::MAX)
                    .saturating_add(delta_secs)
                    .clamp(0, MAX_DURATION_SECS as i64);
                self.state.time_left = left as u64;
            }
            TimerPhase::Idle | TimerPhase::Ringing => {}
        }
        self.state
    }

    pub fn set_overlay(&mut self, open: bool) -> TimerState {
        self.state.is_open = open;
        self.state
    }

    /// Change the rest duration used when none is given
    pub fn set_default_duration(&mut self, seconds: u64) -> Result<u64, ControllerError> {
        validate_duration(seconds)?;
        self.default_duration = seconds;
        if self.phase == TimerPhase::Idle {
            self.state.duration = seconds;
        }
        info!("Default rest duration set to {}s", seconds);
        Ok(seconds)
    }

    fn run_until(&mut self, expires_at: i64, time_left: u64, duration: u64) {
        self.expires_at = Some(expires_at);
        self.phase = TimerPhase::Running;
        self.state = TimerState {
            active: true,
            time_left,
            duration,
            is_open: true,
        };
    }

    fn go_idle(&mut self) {
        self.expires_at = None;
        self.phase = TimerPhase::Idle;
        self.state.active = false;
        self.state.time_left = 0;
    }

    /// Ring and return to Idle. `Ringing` only lasts for this call, which
    /// runs under the controller lock, so callers never observe it.
    async fn complete(&mut self) {
        self.phase = TimerPhase::Ringing;
        info!("Rest timer complete");

        ring(self.chime.as_ref());
        deliver(self.notifier.as_ref(), &Notification::foreground_complete()).await;

        self.go_idle();
        self.publish(None).await;
    }

    async fn publish(&self, expires_at: Option<i64>) {
        if let Err(e) = self.store.set(&self.household_id, expires_at).await {
            warn!("Failed to sync rest timer to shared store, keeping local countdown: {}", e);
        }
    }
}

impl std::fmt::Debug for CountdownController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownController")
            .field("household_id", &self.household_id)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn validate_duration(seconds: u64) -> Result<(), ControllerError> {
    match seconds {
        0 => Err(ControllerError::ZeroDuration),
        s if s > MAX_DURATION_SECS => Err(ControllerError::DurationTooLong),
        _ => Ok(()),
    }
}

fn secs_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX / 1000).saturating_mul(1000)
}
