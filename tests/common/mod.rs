//! Test doubles shared by the integration suites
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use rest_timer::{
    services::{Notification, Notifier},
    storage::{DurableKv, StoreError, StoreResult},
};

/// Records every notification it is asked to show
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Behaves like a notifier whose permission was never granted
#[derive(Debug, Default)]
pub struct DeniedNotifier;

#[async_trait]
impl Notifier for DeniedNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), String> {
        Err("notification permission not granted".to_string())
    }
}

/// A store that is unreachable
#[derive(Debug, Default)]
pub struct UnreachableKv;

#[async_trait]
impl<V: Send + Sync + 'static> DurableKv<V> for UnreachableKv {
    async fn get(&self, _key: &str) -> StoreResult<Option<V>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: V) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Counts how many times the audible cue played
#[derive(Debug, Default)]
pub struct CountingChime {
    plays: std::sync::atomic::AtomicUsize,
}

impl CountingChime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn plays(&self) -> usize {
        self.plays.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl rest_timer::services::Chime for CountingChime {
    fn play(&self) -> Result<(), String> {
        self.plays.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory store whose writes can be made to fail on demand
#[derive(Debug)]
pub struct FlakyKv<V> {
    inner: rest_timer::storage::MemoryKv<V>,
    failing: std::sync::atomic::AtomicBool,
}

impl<V> FlakyKv<V> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: rest_timer::storage::MemoryKv::new(),
            failing: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> DurableKv<V> for FlakyKv<V> {
    async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: V) -> StoreResult<()> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }
}
