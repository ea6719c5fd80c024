//! Encrypted checkpoint store
//!
//! [`CheckpointStore`] is the single owner of checkpoint persistence: the
//! engine never talks to a [`StorageBackend`] directly. Every write path
//! serializes the checkpoint, seals it with AES-256-GCM and hands the
//! ciphertext to the backend; every read path reverses that.
//!
//! Two failure-handling rules shape this module:
//!
//! - An unreachable backend at [`initialize`](CheckpointStore::initialize)
//!   is fatal: the engine must not start without persistence.
//! - A blob that cannot be opened or parsed on [`get`](CheckpointStore::get)
//!   is treated as "no checkpoint" (cold start), never as a fatal error.
//!   Key rotation or corruption must not strand a conversation.
//!
//! Cleanup collects candidate run ids under a read pass and then deletes
//! entry by entry, tolerating "not found": administrative deletion may race
//! with active runs, and idempotent removal makes that race harmless.

use crate::backend::StorageBackend;
use crate::checkpoint::{Checkpoint, CheckpointFilter, CheckpointStats, RunId};
use crate::crypto::{CipherKey, StateCipher};
use crate::error::{CheckpointError, Result};
use crate::serializer::{JsonSerializer, SerializerProtocol};
use futures::stream::{self, Stream};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Finite, single-pass stream of checkpoints
///
/// Produced by [`CheckpointStore::list`]; a point-in-time snapshot, not
/// restartable beyond one pass.
pub type CheckpointStream = Pin<Box<dyn Stream<Item = Checkpoint> + Send + 'static>>;

/// Key prefix separating checkpoints from other tenants of a shared backend
const KEY_PREFIX: &str = "ckpt/";

fn storage_key(run_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, run_id)
}

/// Durable, encrypted key-value persistence for conversation state
pub struct CheckpointStore<S: SerializerProtocol = JsonSerializer> {
    backend: Arc<dyn StorageBackend>,
    cipher: StateCipher,
    serializer: S,
    initialized: AtomicBool,
}

impl CheckpointStore<JsonSerializer> {
    /// Create a store over the given backend with the default JSON
    /// serializer. The key is supplied out-of-band.
    pub fn new(backend: Arc<dyn StorageBackend>, key: CipherKey) -> Self {
        Self::with_serializer(backend, key, JsonSerializer::new())
    }
}

impl<S: SerializerProtocol> CheckpointStore<S> {
    /// Create a store with a custom serialization protocol
    pub fn with_serializer(backend: Arc<dyn StorageBackend>, key: CipherKey, serializer: S) -> Self {
        Self {
            backend,
            cipher: StateCipher::new(&key),
            serializer,
            initialized: AtomicBool::new(false),
        }
    }

    /// Idempotent setup of the backing storage
    ///
    /// Fails fatally if the backend is unreachable; the engine refuses to
    /// start a run without a working persistence layer.
    pub async fn initialize(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        self.backend
            .ping()
            .await
            .map_err(|e| CheckpointError::Unavailable(e.to_string()))?;
        self.initialized.store(true, Ordering::Release);
        debug!("checkpoint store initialized");
        Ok(())
    }

    /// Fetch the checkpoint for `run_id`, if one exists and can be opened
    ///
    /// A missing key, a failed decrypt (wrong key, corruption) and a failed
    /// deserialize all yield `Ok(None)`: the caller starts cold.
    pub async fn get(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        let Some(sealed) = self.backend.read(&storage_key(run_id)).await? else {
            return Ok(None);
        };

        let plaintext = match self.cipher.open(&sealed) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(run_id, error = %e, "checkpoint could not be decrypted, treating as cold start");
                return Ok(None);
            }
        };

        match self.serializer.loads::<Checkpoint>(&plaintext) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!(run_id, error = %e, "checkpoint could not be parsed, treating as cold start");
                Ok(None)
            }
        }
    }

    /// Upsert the state for `run_id`, bumping the audit version
    pub async fn put(
        &self,
        run_id: &str,
        user_id: &str,
        state: serde_json::Value,
    ) -> Result<Checkpoint> {
        let checkpoint = match self.get(run_id).await? {
            Some(existing) => existing.superseded_by(state),
            None => Checkpoint::new(run_id, user_id, state),
        };

        let plaintext = self.serializer.dumps(&checkpoint)?;
        let sealed = self.cipher.seal(&plaintext)?;
        self.backend.write(&storage_key(run_id), sealed).await?;

        debug!(run_id, version = checkpoint.version, "checkpoint written");
        Ok(checkpoint)
    }

    /// Delete the checkpoint for `run_id`, reporting whether it existed
    ///
    /// Idempotent: deleting an absent run id returns `Ok(false)`.
    pub async fn delete(&self, run_id: &str) -> Result<bool> {
        self.backend.remove(&storage_key(run_id)).await
    }

    /// Stream all checkpoints matching `filter`
    ///
    /// The result is a finite snapshot taken at call time; entries that
    /// cannot be opened are skipped. Used by statistics and cleanup scans.
    pub async fn list(&self, filter: CheckpointFilter) -> Result<CheckpointStream> {
        let mut matched = Vec::new();
        for key in self.backend.keys().await? {
            let Some(run_id) = key.strip_prefix(KEY_PREFIX) else {
                continue;
            };
            if let Some(checkpoint) = self.get(run_id).await? {
                if filter.matches(&checkpoint) {
                    matched.push(checkpoint);
                }
            }
        }
        Ok(Box::pin(stream::iter(matched)))
    }

    /// Aggregate statistics across all stored checkpoints
    pub async fn get_stats(&self) -> Result<CheckpointStats> {
        let mut stats = CheckpointStats::default();
        let mut total_size: usize = 0;
        let mut by_user: HashMap<String, usize> = HashMap::new();

        for key in self.backend.keys().await? {
            let Some(run_id) = key.strip_prefix(KEY_PREFIX) else {
                continue;
            };
            let Some(checkpoint) = self.get(run_id).await? else {
                continue;
            };

            stats.total_checkpoints += 1;
            total_size += checkpoint.state_size();
            *by_user.entry(checkpoint.user_id.clone()).or_insert(0) += 1;

            stats.oldest_checkpoint = Some(match stats.oldest_checkpoint {
                Some(oldest) if oldest <= checkpoint.created_at => oldest,
                _ => checkpoint.created_at,
            });
            stats.newest_checkpoint = Some(match stats.newest_checkpoint {
                Some(newest) if newest >= checkpoint.updated_at => newest,
                _ => checkpoint.updated_at,
            });
        }

        if stats.total_checkpoints > 0 {
            stats.average_state_size = total_size as f64 / stats.total_checkpoints as f64;
        }
        stats.checkpoints_by_user = by_user;
        Ok(stats)
    }

    /// Delete all checkpoints last updated longer than `max_age` ago
    ///
    /// Safe to call concurrently with `put` for unrelated run ids: the scan
    /// holds no lock across deletions, and a candidate that vanished before
    /// its delete simply does not count.
    pub async fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(max_age)
                .map_err(|e| CheckpointError::Custom(format!("max_age out of range: {}", e)))?;

        let mut expired = Vec::new();
        for key in self.backend.keys().await? {
            let Some(run_id) = key.strip_prefix(KEY_PREFIX) else {
                continue;
            };
            if let Some(checkpoint) = self.get(run_id).await? {
                if checkpoint.updated_at < cutoff {
                    expired.push(checkpoint.run_id);
                }
            }
        }

        let mut deleted = 0;
        for run_id in expired {
            if self.delete(&run_id).await? {
                deleted += 1;
            }
        }

        debug!(deleted, "checkpoint cleanup finished");
        Ok(deleted)
    }
}
