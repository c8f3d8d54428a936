//! Durable storage ports
//!
//! Both the scheduler's local cache and the household-wide expiry field sit
//! behind the same generic key-value port, so the scheduling and
//! reconciliation code never learns which technology backs either store.

pub mod kv;
pub mod local_cache;
pub mod shared_expiry;

// Re-export main types
pub use kv::{DurableKv, JsonFileKv, MemoryKv, StoreError, StoreResult};
pub use local_cache::{CacheEntry, TimerCache, TIMER_END_KEY};
pub use shared_expiry::{SharedExpiry, SharedExpiryStore};
