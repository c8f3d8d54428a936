//! Household-wide expiry field shared by every device

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kv::{DurableKv, MemoryKv, StoreError, StoreResult};

/// One row per household. `None` means no timer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SharedExpiry {
    pub timer_expires_at: Option<DateTime<Utc>>,
}

/// Read/write access to the household expiry field. Last writer wins.
#[derive(Clone)]
pub struct SharedExpiryStore {
    kv: Arc<dyn DurableKv<SharedExpiry>>,
}

impl SharedExpiryStore {
    pub fn new(kv: Arc<dyn DurableKv<SharedExpiry>>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::<SharedExpiry>::new()))
    }

    /// Current expiry for `household_id` in epoch milliseconds
    pub async fn get(&self, household_id: &str) -> StoreResult<Option<i64>> {
        let row = self.kv.get(household_id).await?;
        Ok(row
            .and_then(|row| row.timer_expires_at)
            .map(|at| at.timestamp_millis()))
    }

    /// Overwrite the expiry for `household_id`; `None` clears it
    pub async fn set(&self, household_id: &str, expires_at_ms: Option<i64>) -> StoreResult<()> {
        let timer_expires_at = match expires_at_ms {
            Some(ms) => Some(
                DateTime::<Utc>::from_timestamp_millis(ms).ok_or(StoreError::InvalidTimestamp(ms))?,
            ),
            None => None,
        };

        debug!("Setting timer_expires_at for household {} to {:?}", household_id, timer_expires_at);
        self.kv.put(household_id, SharedExpiry { timer_expires_at }).await
    }
}

impl std::fmt::Debug for SharedExpiryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedExpiryStore").finish_non_exhaustive()
    }
}
