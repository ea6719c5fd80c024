//! Encrypted checkpoint persistence for ragweave conversation runs
//!
//! This crate owns the durable side of the engine: point-in-time snapshots
//! of conversation state ([`Checkpoint`]), sealed with AES-256-GCM before
//! they touch a storage backend, keyed by run identifier and resumable
//! across process restarts.
//!
//! # Components
//!
//! - [`CheckpointStore`]: the single write/read path for checkpoints:
//!   upsert with audit versioning, cold-start-on-decrypt-failure reads,
//!   filtered listing, statistics and age-based cleanup
//! - [`StorageBackend`]: narrow async key-value contract; bring your own
//!   database ([`MemoryBackend`] is the in-process reference)
//! - [`SerializerProtocol`]: pluggable payload encoding
//!   ([`JsonSerializer`] default, [`BincodeSerializer`] for typed payloads)
//! - [`StateCipher`] / [`CipherKey`]: AES-256-GCM seal/open; the key is
//!   supplied out-of-band
//!
//! # Example
//!
//! ```rust
//! use ragweave_checkpoint::{CheckpointStore, CipherKey, MemoryBackend, KEY_LEN};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CheckpointStore::new(
//!         Arc::new(MemoryBackend::new()),
//!         CipherKey::from_bytes([7u8; KEY_LEN]),
//!     );
//!     store.initialize().await?;
//!
//!     store.put("run-1", "alice", serde_json::json!({"turn": 1})).await?;
//!     let loaded = store.get("run-1").await?.expect("just written");
//!     assert_eq!(loaded.version, 1);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod checkpoint;
pub mod crypto;
pub mod error;
pub mod serializer;
pub mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use checkpoint::{new_run_id, Checkpoint, CheckpointFilter, CheckpointStats, RunId};
pub use crypto::{CipherKey, StateCipher, KEY_LEN};
pub use error::{CheckpointError, Result};
pub use serializer::{BincodeSerializer, JsonSerializer, SerializerProtocol};
pub use store::{CheckpointStore, CheckpointStream};
