//! Checkpoint data structures for run-state persistence
//!
//! A [`Checkpoint`] is a point-in-time snapshot of a conversation run's
//! state, keyed by run identifier. Checkpoints are owned exclusively by the
//! [`CheckpointStore`](crate::store::CheckpointStore): the engine hands a
//! serialized state in and gets a versioned, timestamped snapshot back. The
//! `version` field increments on every upsert and exists for external
//! auditing, not for intra-run concurrency control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Run identifier type
pub type RunId = String;

/// Generate a fresh run identifier
pub fn new_run_id() -> RunId {
    Uuid::new_v4().to_string()
}

/// A persisted snapshot of a conversation run's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The run this checkpoint belongs to
    pub run_id: RunId,

    /// The user the run is attributed to
    pub user_id: String,

    /// Serialized agent state at the time of the snapshot
    pub state: serde_json::Value,

    /// Upsert counter, starting at 1 on first write
    pub version: u64,

    /// When the first checkpoint for this run was written
    pub created_at: DateTime<Utc>,

    /// When this snapshot was written
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create the first checkpoint for a run
    pub fn new(run_id: impl Into<RunId>, user_id: impl Into<String>, state: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            user_id: user_id.into(),
            state,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the successor snapshot: same run, bumped version, fresh
    /// `updated_at`, original `created_at` preserved.
    pub fn superseded_by(&self, state: serde_json::Value) -> Self {
        Self {
            run_id: self.run_id.clone(),
            user_id: self.user_id.clone(),
            state,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Approximate size in bytes of the serialized state payload
    pub fn state_size(&self) -> usize {
        serde_json::to_vec(&self.state).map(|v| v.len()).unwrap_or(0)
    }
}

/// Filter for [`CheckpointStore::list`](crate::store::CheckpointStore::list)
#[derive(Debug, Clone, Default)]
pub struct CheckpointFilter {
    /// Only checkpoints attributed to this user
    pub user_id: Option<String>,

    /// Only checkpoints last updated before this instant
    pub updated_before: Option<DateTime<Utc>>,
}

impl CheckpointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_updated_before(mut self, instant: DateTime<Utc>) -> Self {
        self.updated_before = Some(instant);
        self
    }

    /// Whether a checkpoint passes this filter
    pub fn matches(&self, checkpoint: &Checkpoint) -> bool {
        if let Some(user_id) = &self.user_id {
            if &checkpoint.user_id != user_id {
                return false;
            }
        }
        if let Some(before) = self.updated_before {
            if checkpoint.updated_at >= before {
                return false;
            }
        }
        true
    }
}

/// Aggregate statistics over the stored checkpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointStats {
    /// Number of checkpoints currently stored
    pub total_checkpoints: usize,

    /// `created_at` of the oldest checkpoint, if any
    pub oldest_checkpoint: Option<DateTime<Utc>>,

    /// `updated_at` of the newest checkpoint, if any
    pub newest_checkpoint: Option<DateTime<Utc>>,

    /// Mean serialized state size in bytes
    pub average_state_size: f64,

    /// Checkpoint count per user id
    pub checkpoints_by_user: HashMap<String, usize>,
}
