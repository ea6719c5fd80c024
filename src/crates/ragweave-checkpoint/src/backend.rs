//! Pluggable key-value storage backends
//!
//! The checkpoint store is agnostic to where bytes live. [`StorageBackend`]
//! is the narrow contract a persistence backend must satisfy: an opaque
//! async key-value handle supplied at construction time. Downstream
//! projects can back it with PostgreSQL, Redis, sled, S3 or anything else;
//! [`MemoryBackend`] is the reference implementation used in development
//! and tests.
//!
//! Backends only ever see ciphertext: encryption happens in the store
//! layer before bytes reach a backend.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Narrow async key-value contract for checkpoint persistence
///
/// Implementations must be thread-safe (`Send + Sync`) and must treat
/// `remove` of an absent key as a normal outcome (`Ok(false)`), never an
/// error: administrative cleanup races against active runs and relies on
/// idempotent deletion.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Verify the backend is reachable. Called by
    /// [`CheckpointStore::initialize`](crate::store::CheckpointStore::initialize);
    /// an error here is fatal to engine startup.
    async fn ping(&self) -> Result<()>;

    /// Read the value stored under `key`, if any
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write (upsert) the value under `key`
    async fn write(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove the value under `key`, reporting whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Snapshot of all keys currently present
    ///
    /// Used by cleanup scans and statistics. The snapshot is point-in-time;
    /// keys may disappear before a subsequent `read`.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Thread-safe in-memory backend
///
/// Suitable for development, testing and single-process deployments where
/// persistence across restarts is not required.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries (useful for test isolation)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
