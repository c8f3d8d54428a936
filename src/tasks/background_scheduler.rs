//! Background scheduler task
//!
//! Runs as its own task, independent of any page. It never waits longer than
//! `max_interval` in one hop, and every check re-reads the persisted end time,
//! so a suspended or restarted process loses latency but never a completion.
//! An end time whose cache write failed is checked from memory instead, and
//! the write is retried on every hop until it lands.

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    clock::SharedClock,
    protocol::{SchedulerCommand, SchedulerEvent},
    services::notifier::{deliver, Notification, Notifier},
    storage::TimerCache,
};

/// Upper bound on any single scheduled wait
pub const MAX_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Armed,
    Firing,
}

/// Result of a re-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Time remains; the next check is due after this wait
    Rearmed(Duration),
    Fired,
    /// Nothing was armed, or the cache was cleared underneath us
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct ArmedCheck {
    end_time: i64,
    /// False while the cache write for `end_time` has not succeeded
    persisted: bool,
    wait: Duration,
    due: Instant,
}

/// Sending side of the controller/scheduler channel pair
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Create a handle together with the command receiver the scheduler consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SchedulerCommand>) {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(16);
        (Self { commands, events }, commands_rx)
    }

    /// Fire-and-forget a command to the scheduler
    pub fn send(&self, command: SchedulerCommand) {
        if let Err(e) = self.commands.send(command) {
            warn!("Failed to send {:?} to scheduler: {}", command, e);
        }
    }

    /// Subscribe to completion broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> broadcast::Sender<SchedulerEvent> {
        self.events.clone()
    }
}

/// Scheduler state, owned by exactly one task
pub struct BackgroundScheduler {
    cache: TimerCache,
    notifier: Arc<dyn Notifier>,
    clock: SharedClock,
    events: broadcast::Sender<SchedulerEvent>,
    max_interval: Duration,
    phase: SchedulerPhase,
    armed: Option<ArmedCheck>,
}

impl BackgroundScheduler {
    pub fn new(
        cache: TimerCache,
        notifier: Arc<dyn Notifier>,
        clock: SharedClock,
        events: broadcast::Sender<SchedulerEvent>,
        max_interval: Duration,
    ) -> Self {
        Self {
            cache,
            notifier,
            clock,
            events,
            max_interval,
            phase: SchedulerPhase::Idle,
            armed: None,
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Wait until the next armed check, if any
    pub fn armed_wait(&self) -> Option<Duration> {
        self.armed.map(|armed| armed.wait)
    }

    pub fn armed_end_time(&self) -> Option<i64> {
        self.armed.map(|armed| armed.end_time)
    }

    pub async fn handle(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::StartTimer { delay_ms } => {
                self.start(delay_ms).await;
            }
            SchedulerCommand::CancelTimer => self.cancel().await,
            SchedulerCommand::Wake => {
                self.wake().await;
            }
        }
    }

    /// Arm a new countdown, superseding any existing one.
    /// Returns the wait until the first check.
    pub async fn start(&mut self, delay_ms: u64) -> Duration {
        if let Some(previous) = self.armed.take() {
            debug!("Superseding timer ending at {}", previous.end_time);
        }

        let delay_ms = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        let end_time = self.clock.now_ms().saturating_add(delay_ms);
        let persisted = self.persist(end_time).await;

        info!("Armed rest timer for {} ms (ends at {})", delay_ms, end_time);
        self.arm(end_time, delay_ms, persisted)
    }

    async fn persist(&self, end_time: i64) -> bool {
        match self.cache.store(end_time).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist timer end time, keeping it in memory: {}", e);
                false
            }
        }
    }

    fn arm(&mut self, end_time: i64, remaining_ms: i64, persisted: bool) -> Duration {
        let wait = Duration::from_millis(remaining_ms.max(0) as u64).min(self.max_interval);
        self.armed = Some(ArmedCheck {
            end_time,
            persisted,
            wait,
            due: Instant::now() + wait,
        });
        self.phase = SchedulerPhase::Armed;
        debug!("Next timer check in {} ms", wait.as_millis());
        wait
    }

    /// Run when an armed wait elapses
    pub async fn recheck(&mut self) -> CheckOutcome {
        let Some(armed) = self.armed.take() else {
            return CheckOutcome::Idle;
        };

        let (end_time, persisted) = if armed.persisted {
            // The cache is the durable record: a cancel that cleared it first wins
            let Some(entry) = self.cache.load().await else {
                debug!("Timer ending at {} was cleared before its check", armed.end_time);
                self.phase = SchedulerPhase::Idle;
                return CheckOutcome::Idle;
            };
            (entry.end_time, true)
        } else {
            // Whatever the cache holds predates this timer
            (armed.end_time, self.persist(armed.end_time).await)
        };

        let remaining = end_time.saturating_sub(self.clock.now_ms());
        if remaining <= 0 {
            self.fire(Notification::rest_complete()).await;
            CheckOutcome::Fired
        } else {
            CheckOutcome::Rearmed(self.arm(end_time, remaining, persisted))
        }
    }

    /// Disarm unconditionally
    pub async fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            info!("Cancelled rest timer ending at {}", armed.end_time);
        }
        if let Err(e) = self.cache.clear().await {
            warn!("Failed to clear timer cache on cancel: {}", e);
        }
        self.phase = SchedulerPhase::Idle;
    }

    /// Passive recovery after the hosting context was revived.
    /// Returns true when a missed expiry was fired.
    pub async fn wake(&mut self) -> bool {
        // The cache cannot speak for a timer it never recorded
        if self.armed.is_some_and(|armed| !armed.persisted) {
            return false;
        }

        let Some(entry) = self.cache.load().await else {
            return false;
        };

        let now = self.clock.now_ms();
        if entry.end_time <= now {
            info!("Recovered missed rest timer expiry ({} ms overdue)", now - entry.end_time);
            self.armed = None;
            self.fire(Notification::missed_rest_complete()).await;
            return true;
        }

        if self.armed.is_none() {
            info!("Resuming checks for rest timer ending at {}", entry.end_time);
            self.arm(entry.end_time, entry.end_time - now, true);
        }
        false
    }

    async fn fire(&mut self, notification: Notification) {
        self.phase = SchedulerPhase::Firing;

        deliver(self.notifier.as_ref(), &notification).await;
        if self.events.send(SchedulerEvent::TimerDone).is_err() {
            debug!("No live controllers to receive TIMER_DONE");
        }
        if let Err(e) = self.cache.clear().await {
            warn!("Failed to clear timer cache after firing: {}", e);
        }

        self.armed = None;
        self.phase = SchedulerPhase::Idle;
    }

    /// Command loop. Ends when every [`SchedulerHandle`] is dropped.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SchedulerCommand>) {
        info!("Starting background scheduler task");

        // A fresh process is itself a wake
        self.wake().await;

        loop {
            let due = self.armed.map(|armed| armed.due);
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        debug!("Scheduler received {:?}", command);
                        self.handle(command).await;
                    }
                    None => {
                        info!("Scheduler command channel closed, stopping");
                        break;
                    }
                },
                _ = sleep_until_due(due) => {
                    self.recheck().await;
                }
            }
        }
    }
}

async fn sleep_until_due(due: Option<Instant>) {
    match due {
        Some(due) => sleep_until(due).await,
        None => std::future::pending().await,
    }
}

/// Spawn the scheduler on its own task and return the handle used to talk to it
pub fn spawn_background_scheduler(
    cache: TimerCache,
    notifier: Arc<dyn Notifier>,
    clock: SharedClock,
    max_interval: Duration,
) -> (SchedulerHandle, JoinHandle<()>) {
    let (handle, commands) = SchedulerHandle::channel();
    let scheduler = BackgroundScheduler::new(cache, notifier, clock, handle.events(), max_interval);
    let task = tokio::spawn(scheduler.run(commands));
    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, services::notifier::NullNotifier};

    fn scheduler(clock: &ManualClock, cache: &TimerCache) -> BackgroundScheduler {
        let (events, _) = broadcast::channel(4);
        BackgroundScheduler::new(
            cache.clone(),
            Arc::new(NullNotifier),
            Arc::new(clock.clone()),
            events,
            MAX_INTERVAL,
        )
    }

    #[tokio::test]
    async fn short_delay_waits_exactly_once() {
        let clock = ManualClock::new(1_000_000);
        let cache = TimerCache::in_memory();
        let mut scheduler = scheduler(&clock, &cache);

        assert_eq!(scheduler.start(12_000).await, Duration::from_millis(12_000));
        assert_eq!(scheduler.phase(), SchedulerPhase::Armed);
        assert_eq!(scheduler.armed_end_time(), Some(1_012_000));

        clock.advance(12_000);
        assert_eq!(scheduler.recheck().await, CheckOutcome::Fired);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn early_wakeup_rearms_for_remainder() {
        let clock = ManualClock::new(0);
        let cache = TimerCache::in_memory();
        let mut scheduler = scheduler(&clock, &cache);

        scheduler.start(10_000).await;
        // Host woke us early
        clock.advance(4_000);
        assert_eq!(
            scheduler.recheck().await,
            CheckOutcome::Rearmed(Duration::from_millis(6_000))
        );
    }

    #[tokio::test]
    async fn restart_supersedes_previous_timer() {
        let clock = ManualClock::new(0);
        let cache = TimerCache::in_memory();
        let mut scheduler = scheduler(&clock, &cache);

        scheduler.start(60_000).await;
        clock.advance(1_000);
        scheduler.start(5_000).await;

        assert_eq!(scheduler.armed_end_time(), Some(6_000));
        assert_eq!(cache.load().await.map(|e| e.end_time), Some(6_000));
    }

    #[tokio::test]
    async fn cancel_from_idle_is_harmless() {
        let clock = ManualClock::new(0);
        let cache = TimerCache::in_memory();
        let mut scheduler = scheduler(&clock, &cache);

        scheduler.cancel().await;
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
        assert_eq!(scheduler.recheck().await, CheckOutcome::Idle);
    }

    #[tokio::test]
    async fn wake_resumes_chain_for_pending_entry() {
        let clock = ManualClock::new(100_000);
        let cache = TimerCache::in_memory();
        cache.store(190_000).await.unwrap();

        let mut scheduler = scheduler(&clock, &cache);
        assert!(!scheduler.wake().await);
        assert_eq!(scheduler.phase(), SchedulerPhase::Armed);
        assert_eq!(scheduler.armed_wait(), Some(MAX_INTERVAL));
    }
}
