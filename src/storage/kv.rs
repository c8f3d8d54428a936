//! Generic durable key-value port and its backends

use std::{
    collections::HashMap,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Mutex,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt entry for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A durable key-value slot map holding values of type `V`
#[async_trait]
pub trait DurableKv<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    /// Read the value stored under `key`, if any
    async fn get(&self, key: &str) -> StoreResult<Option<V>>;

    /// Overwrite the value stored under `key`
    async fn put(&self, key: &str, value: V) -> StoreResult<()>;

    /// Remove `key`; removing an absent key succeeds
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Process-local backend. Survives nothing beyond the process, which is
/// enough for tests and for running a single device without files.
#[derive(Debug)]
pub struct MemoryKv<V> {
    entries: Mutex<HashMap<String, V>>,
}

impl<V> MemoryKv<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryKv<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> DurableKv<V> for MemoryKv<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        let entries = self.entries.lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: V) -> StoreResult<()> {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}

/// File backend: one JSON object on disk mapping keys to values.
///
/// Several processes may point at the same file; writes are whole-file
/// replacements via rename, so the last writer wins.
#[derive(Debug)]
pub struct JsonFileKv<V> {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonFileKv<V> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> StoreResult<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Map::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                key: self.path.display().to_string(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read the map for a read-modify-write; a corrupt file is replaced
    async fn read_map_for_update(&self) -> StoreResult<Map<String, Value>> {
        match self.read_map().await {
            Err(StoreError::Corrupt { key, source }) => {
                warn!("Discarding corrupt store file {}: {}", key, source);
                Ok(Map::new())
            }
            other => other,
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!("Wrote {} entries to {}", map.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl<V> DurableKv<V> for JsonFileKv<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        let map = self.read_map().await?;
        match map.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: V) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map_for_update().await?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_map(&map).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map_for_update().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}
