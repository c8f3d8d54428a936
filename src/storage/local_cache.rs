//! Durable local cache holding the armed timer's end time

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kv::{DurableKv, MemoryKv, StoreResult};

/// Cache key for the armed timer's end time
pub const TIMER_END_KEY: &str = "/timer-end";

/// Present only while a timer is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Absolute end time in epoch milliseconds
    pub end_time: i64,
}

/// The scheduler's single persistent slot
#[derive(Clone)]
pub struct TimerCache {
    kv: Arc<dyn DurableKv<CacheEntry>>,
}

impl TimerCache {
    pub fn new(kv: Arc<dyn DurableKv<CacheEntry>>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::<CacheEntry>::new()))
    }

    /// Persist the end time of a newly armed timer
    pub async fn store(&self, end_time: i64) -> StoreResult<()> {
        debug!("Persisting timer end time {}", end_time);
        self.kv.put(TIMER_END_KEY, CacheEntry { end_time }).await
    }

    /// Load the pending entry. Anything unreadable means no timer is pending.
    pub async fn load(&self) -> Option<CacheEntry> {
        match self.kv.get(TIMER_END_KEY).await {
            Ok(Some(entry)) if entry.end_time > 0 => Some(entry),
            Ok(Some(entry)) => {
                warn!("Ignoring cache entry with invalid end time {}", entry.end_time);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Unreadable timer cache entry, treating as idle: {}", e);
                None
            }
        }
    }

    pub async fn clear(&self) -> StoreResult<()> {
        debug!("Clearing timer cache entry");
        self.kv.delete(TIMER_END_KEY).await
    }
}

impl std::fmt::Debug for TimerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerCache").finish_non_exhaustive()
    }
}
