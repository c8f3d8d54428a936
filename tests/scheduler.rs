//! Background scheduler behaviour: hop bounds, firing, recovery and cancellation

mod common;

use std::{sync::Arc, time::Duration};
use rest_timer::{
    clock::{Clock, ManualClock},
    protocol::{SchedulerCommand, SchedulerEvent},
    services::Notifier,
    storage::{CacheEntry, JsonFileKv, TimerCache},
    tasks::{
        spawn_background_scheduler, BackgroundScheduler, CheckOutcome, SchedulerPhase,
        MAX_INTERVAL,
    },
};
use tokio::sync::broadcast;

use common::{DeniedNotifier, FlakyKv, RecordingNotifier, UnreachableKv};

const T0: i64 = 1_700_000_000_000;

struct Harness {
    clock: ManualClock,
    cache: TimerCache,
    notifier: Arc<RecordingNotifier>,
    events: broadcast::Receiver<SchedulerEvent>,
    scheduler: BackgroundScheduler,
}

fn harness() -> Harness {
    harness_with_cache(TimerCache::in_memory())
}

fn harness_with_cache(cache: TimerCache) -> Harness {
    let clock = ManualClock::new(T0);
    let notifier = RecordingNotifier::new();
    let (events_tx, events) = broadcast::channel(8);
    let scheduler = BackgroundScheduler::new(
        cache.clone(),
        notifier.clone(),
        Arc::new(clock.clone()),
        events_tx,
        MAX_INTERVAL,
    );
    Harness {
        clock,
        cache,
        notifier,
        events,
        scheduler,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test]
async fn long_delay_never_waits_more_than_max_interval() {
    let mut h = harness();

    let mut waits = vec![h.scheduler.start(90_000).await];
    loop {
        let wait = *waits.last().unwrap();
        assert!(wait <= MAX_INTERVAL);
        h.clock.advance(wait.as_millis() as i64);
        match h.scheduler.recheck().await {
            CheckOutcome::Rearmed(next) => waits.push(next),
            CheckOutcome::Fired => break,
            CheckOutcome::Idle => panic!("timer went idle before firing"),
        }
    }

    assert_eq!(waits, vec![Duration::from_secs(30); 3]);
    assert_eq!(h.clock.now_ms() - T0, 90_000);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.events.try_recv().unwrap(), SchedulerEvent::TimerDone);
}

#[tokio::test]
async fn scheduled_fire_uses_collapsing_tag() {
    let mut h = harness();
    h.scheduler.start(1_000).await;
    h.clock.advance(1_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Fired);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Rest Complete! 💪");
    assert_eq!(sent[0].body, "Time to crush the next set");
    assert_eq!(sent[0].tag, "rest-timer");
}

#[tokio::test]
async fn firing_clears_cache_so_later_wake_does_not_refire() {
    let mut h = harness();
    h.scheduler.start(5_000).await;
    assert_eq!(h.cache.load().await, Some(CacheEntry { end_time: T0 + 5_000 }));

    h.clock.advance(5_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Fired);
    assert_eq!(h.cache.load().await, None);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);

    h.clock.advance(60_000);
    assert!(!h.scheduler.wake().await);
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn missed_expiry_fires_once_on_wake() {
    let mut h = harness();
    // Armed by a process that was killed before its chain could fire
    h.cache.store(T0 - 5_000).await.unwrap();

    assert!(h.scheduler.wake().await);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.notifier.sent()[0].body, "Your rest period is over");
    assert_eq!(h.cache.load().await, None);
    assert_eq!(h.events.try_recv().unwrap(), SchedulerEvent::TimerDone);

    assert!(!h.scheduler.wake().await);
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn cancel_before_recheck_suppresses_fire() {
    let mut h = harness();
    h.scheduler.start(10_000).await;
    h.scheduler.cancel().await;
    assert_eq!(h.cache.load().await, None);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);

    h.clock.advance(10_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Idle);
    assert!(!h.scheduler.wake().await);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn cache_cleared_elsewhere_before_recheck_wins() {
    let mut h = harness();
    h.scheduler.start(10_000).await;

    // Cancel durably recorded by another writer of the same cache
    h.cache.clear().await.unwrap();
    h.clock.advance(10_000);

    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Idle);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn last_start_wins() {
    let mut h = harness();
    h.scheduler.start(60_000).await;
    h.scheduler.start(20_000).await;

    h.clock.advance(20_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Fired);

    h.clock.advance(40_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Idle);
    assert!(!h.scheduler.wake().await);
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn denied_notification_still_completes_firing() {
    let clock = ManualClock::new(T0);
    let cache = TimerCache::in_memory();
    let notifier: Arc<dyn Notifier> = Arc::new(DeniedNotifier);
    let (events_tx, mut events) = broadcast::channel(4);
    let mut scheduler = BackgroundScheduler::new(
        cache.clone(),
        notifier,
        Arc::new(clock.clone()),
        events_tx,
        MAX_INTERVAL,
    );

    scheduler.start(2_000).await;
    clock.advance(2_000);
    assert_eq!(scheduler.recheck().await, CheckOutcome::Fired);
    assert_eq!(cache.load().await, None);
    assert_eq!(events.try_recv().unwrap(), SchedulerEvent::TimerDone);
}

#[tokio::test]
async fn corrupt_cache_is_treated_as_no_timer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "\u{0}\u{0}garbage").unwrap();

    let cache = TimerCache::new(Arc::new(JsonFileKv::<CacheEntry>::new(&path)));
    let mut h = harness_with_cache(cache);

    assert!(!h.scheduler.wake().await);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::Idle);
    assert_eq!(h.notifier.count(), 0);

    // Arming over the corrupt file works
    h.scheduler.start(1_000).await;
    assert_eq!(h.cache.load().await, Some(CacheEntry { end_time: T0 + 1_000 }));
}

#[tokio::test]
async fn unwritable_cache_still_fires_from_memory() {
    let mut h = harness_with_cache(TimerCache::new(Arc::new(UnreachableKv)));

    assert_eq!(h.scheduler.start(45_000).await, MAX_INTERVAL);
    h.clock.advance(30_000);
    assert_eq!(
        h.scheduler.recheck().await,
        CheckOutcome::Rearmed(Duration::from_secs(15))
    );

    // A wake cannot see the timer in the cache and must leave it armed
    assert!(!h.scheduler.wake().await);
    assert_eq!(h.scheduler.armed_end_time(), Some(T0 + 45_000));

    h.clock.advance(15_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Fired);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.events.try_recv().unwrap(), SchedulerEvent::TimerDone);
}

#[tokio::test]
async fn unwritable_cache_still_honours_cancel() {
    let mut h = harness_with_cache(TimerCache::new(Arc::new(UnreachableKv)));
    h.scheduler.start(5_000).await;
    h.scheduler.cancel().await;

    h.clock.advance(5_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Idle);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn failed_write_ignores_stale_entry_and_retries() {
    let kv = FlakyKv::<CacheEntry>::new();
    let mut h = harness_with_cache(TimerCache::new(kv.clone()));

    h.scheduler.start(60_000).await;
    kv.set_failing(true);
    h.scheduler.start(40_000).await;
    assert_eq!(h.cache.load().await, Some(CacheEntry { end_time: T0 + 60_000 }));

    kv.set_failing(false);
    h.clock.advance(30_000);
    assert_eq!(
        h.scheduler.recheck().await,
        CheckOutcome::Rearmed(Duration::from_secs(10))
    );
    assert_eq!(h.cache.load().await, Some(CacheEntry { end_time: T0 + 40_000 }));

    h.clock.advance(10_000);
    assert_eq!(h.scheduler.recheck().await, CheckOutcome::Fired);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.cache.load().await, None);
}

#[tokio::test(start_paused = true)]
async fn spawned_scheduler_fires_after_hops() {
    let clock = ManualClock::new(T0);
    let cache = TimerCache::in_memory();
    let notifier = RecordingNotifier::new();
    let (handle, _task) =
        spawn_background_scheduler(cache.clone(), notifier.clone(), Arc::new(clock.clone()), MAX_INTERVAL);
    let mut done = handle.subscribe();

    handle.send(SchedulerCommand::StartTimer { delay_ms: 45_000 });
    settle().await;
    assert_eq!(cache.load().await, Some(CacheEntry { end_time: T0 + 45_000 }));

    clock.advance(30_000);
    tokio::time::sleep(Duration::from_secs(30)).await;
    settle().await;
    assert!(done.try_recv().is_err());
    assert_eq!(notifier.count(), 0);

    clock.advance(15_000);
    tokio::time::sleep(Duration::from_secs(15)).await;
    settle().await;
    assert_eq!(done.try_recv().unwrap(), SchedulerEvent::TimerDone);
    assert_eq!(notifier.count(), 1);
    assert_eq!(cache.load().await, None);
}

#[tokio::test(start_paused = true)]
async fn spawned_scheduler_recovers_timer_from_previous_process() {
    let clock = ManualClock::new(T0);
    let cache = TimerCache::in_memory();
    cache.store(T0 + 20_000).await.unwrap();

    let notifier = RecordingNotifier::new();
    let (handle, _task) =
        spawn_background_scheduler(cache.clone(), notifier.clone(), Arc::new(clock.clone()), MAX_INTERVAL);
    let mut done = handle.subscribe();
    settle().await;

    clock.advance(20_000);
    tokio::time::sleep(Duration::from_secs(20)).await;
    settle().await;

    assert_eq!(done.try_recv().unwrap(), SchedulerEvent::TimerDone);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn spawned_scheduler_honours_cancel() {
    let clock = ManualClock::new(T0);
    let cache = TimerCache::in_memory();
    let notifier = RecordingNotifier::new();
    let (handle, _task) =
        spawn_background_scheduler(cache.clone(), notifier.clone(), Arc::new(clock.clone()), MAX_INTERVAL);
    let mut done = handle.subscribe();

    handle.send(SchedulerCommand::StartTimer { delay_ms: 10_000 });
    handle.send(SchedulerCommand::CancelTimer);
    settle().await;
    assert_eq!(cache.load().await, None);

    clock.advance(10_000);
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.send(SchedulerCommand::Wake);
    settle().await;

    assert!(done.try_recv().is_err());
    assert_eq!(notifier.count(), 0);
}
