//! Data retention manager
//!
//! Tracks consent grants and artifact retention records, computes expiry,
//! and performs the two compliance-sensitive bulk operations: expiry-based
//! cleanup and unconditional per-user purge. Both run out-of-band against
//! the same checkpoint store active conversations use, so deletion must be
//! idempotent and tolerant of artifacts that vanished mid-sweep.
//!
//! Failure discipline differs from the conversational path on purpose:
//! administrative callers are operators, so errors propagate, with one
//! exception. Inside a cleanup batch, each record's deletion is
//! independent: a single artifact failing to delete is logged, the record
//! is kept for the next sweep, and the batch continues. A retention policy
//! is never violated by deleting early, only by failing to delete late,
//! and the next sweep retries.

use crate::error::{RetentionError, Result};
use crate::records::{
    CleanupReport, ConsentRecord, RetentionRecord, RetentionStats, DEFAULT_RETENTION_DAYS,
    MAX_CONSENT_DAYS, MIN_CONSENT_DAYS,
};
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use ragweave_checkpoint::{CheckpointFilter, CheckpointStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tracks consent, computes expiry, and deletes what has aged out
pub struct DataRetentionManager {
    checkpoints: Arc<CheckpointStore>,
    records: RwLock<HashMap<String, RetentionRecord>>,
    consents: RwLock<HashMap<(String, String), ConsentRecord>>,
}

impl DataRetentionManager {
    pub fn new(checkpoints: Arc<CheckpointStore>) -> Self {
        Self {
            checkpoints,
            records: RwLock::new(HashMap::new()),
            consents: RwLock::new(HashMap::new()),
        }
    }

    /// Track a newly written artifact for expiry-based deletion
    pub async fn register_data_record(
        &self,
        artifact_id: impl Into<String>,
        user_id: impl Into<String>,
        category: impl Into<String>,
        created_at: DateTime<Utc>,
    ) {
        let record = RetentionRecord::new(artifact_id, user_id, category, created_at);
        self.records
            .write()
            .await
            .insert(record.artifact_id.clone(), record);
    }

    /// Record a consent grant
    ///
    /// `duration_days` must be in `[MIN_CONSENT_DAYS, MAX_CONSENT_DAYS]`;
    /// an out-of-range value is a validation failure, never silently
    /// clamped. A new grant supersedes any previous one for the same
    /// `(user, category)` pair.
    pub async fn record_consent(
        &self,
        user_id: impl Into<String>,
        category: impl Into<String>,
        duration_days: u32,
    ) -> Result<()> {
        if !(MIN_CONSENT_DAYS..=MAX_CONSENT_DAYS).contains(&duration_days) {
            return Err(RetentionError::InvalidDuration {
                days: duration_days as i64,
                min: MIN_CONSENT_DAYS,
                max: MAX_CONSENT_DAYS,
            });
        }

        let record = ConsentRecord::new(user_id, category, duration_days);
        debug!(
            user_id = %record.user_id,
            category = %record.data_category,
            duration_days,
            "consent recorded"
        );
        self.consents.write().await.insert(
            (record.user_id.clone(), record.data_category.clone()),
            record,
        );
        Ok(())
    }

    /// Retention applied to a `(user, category)` pair: the latest matching
    /// consent, or the system default when none exists.
    pub async fn effective_retention_days(&self, user_id: &str, category: &str) -> u32 {
        self.consents
            .read()
            .await
            .get(&(user_id.to_string(), category.to_string()))
            .map(|c| c.duration_days)
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    /// Aggregate statistics over tracked records
    pub async fn get_stats(&self) -> RetentionStats {
        let records = self.records.read().await;
        let mut stats = RetentionStats {
            total_records: records.len(),
            ..RetentionStats::default()
        };

        for record in records.values() {
            *stats
                .records_by_category
                .entry(record.category.clone())
                .or_insert(0) += 1;
            *stats
                .records_by_user
                .entry(record.user_id.clone())
                .or_insert(0) += 1;

            stats.oldest_record = Some(match stats.oldest_record {
                Some(oldest) if oldest <= record.created_at => oldest,
                _ => record.created_at,
            });
            stats.newest_record = Some(match stats.newest_record {
                Some(newest) if newest >= record.created_at => newest,
                _ => record.created_at,
            });
        }

        stats
    }

    /// Delete every artifact whose retention window has passed
    ///
    /// Expiry is `created_at + effective_retention(user, category)`. Each
    /// record is processed independently: a store failure on one artifact
    /// keeps its record for the next sweep and the batch continues. Running
    /// the sweep twice back-to-back deletes nothing the second time.
    pub async fn cleanup_expired_data(&self) -> Result<CleanupReport> {
        let now = Utc::now();
        let snapshot: Vec<RetentionRecord> =
            self.records.read().await.values().cloned().collect();

        let mut deleted_count = 0;
        for record in snapshot {
            let retention_days = self
                .effective_retention_days(&record.user_id, &record.category)
                .await;
            let expires_at = record.created_at + Duration::days(retention_days as i64);
            if now <= expires_at {
                continue;
            }

            match self.checkpoints.delete(&record.artifact_id).await {
                Ok(existed) => {
                    self.records.write().await.remove(&record.artifact_id);
                    deleted_count += 1;
                    debug!(
                        artifact_id = %record.artifact_id,
                        existed,
                        "expired artifact removed"
                    );
                }
                Err(error) => {
                    // Record stays; the next sweep retries this artifact.
                    warn!(
                        artifact_id = %record.artifact_id,
                        error = %error,
                        "failed to delete expired artifact, skipping"
                    );
                }
            }
        }

        info!(deleted_count, "expiry cleanup finished");
        Ok(CleanupReport { deleted_count })
    }

    /// Unconditional purge of everything attributed to a user
    ///
    /// Used for explicit deletion requests, so it must be exhaustive: the
    /// tracked retention records are deleted first, then a full
    /// checkpoint-store scan catches any checkpoint that was never
    /// registered. Consent records for the user are removed as well.
    /// Returns the number of checkpoints actually deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize> {
        let mut deleted = 0;

        // Pass 1: artifacts we track.
        let tracked: Vec<String> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.artifact_id.clone())
            .collect();

        for artifact_id in &tracked {
            if self.checkpoints.delete(artifact_id).await? {
                deleted += 1;
            }
            self.records.write().await.remove(artifact_id);
        }

        // Pass 2: anything in the store attributed to the user but never
        // registered with the manager.
        let mut stream = self
            .checkpoints
            .list(CheckpointFilter::new().with_user_id(user_id))
            .await?;
        while let Some(checkpoint) = stream.next().await {
            if self.checkpoints.delete(&checkpoint.run_id).await? {
                deleted += 1;
            }
            self.records.write().await.remove(&checkpoint.run_id);
        }

        self.consents
            .write()
            .await
            .retain(|(consent_user, _), _| consent_user != user_id);

        info!(user_id, deleted, "user data purge finished");
        Ok(deleted)
    }

    /// Number of retention records currently tracked (test helper)
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}
