//! Consent and retention record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shortest consent grant accepted, in days
pub const MIN_CONSENT_DAYS: u32 = 1;

/// Longest consent grant accepted, in days (about five years)
pub const MAX_CONSENT_DAYS: u32 = 1825;

/// Retention applied when no consent record exists for a category
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// A time-bounded grant controlling how long a data category may be kept
///
/// Never mutated: a new grant for the same `(user_id, data_category)`
/// supersedes the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub user_id: String,
    pub data_category: String,
    pub granted_at: DateTime<Utc>,
    pub duration_days: u32,
}

impl ConsentRecord {
    pub fn new(
        user_id: impl Into<String>,
        data_category: impl Into<String>,
        duration_days: u32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            data_category: data_category.into(),
            granted_at: Utc::now(),
            duration_days,
        }
    }
}

/// Metadata about a stored artifact, used to decide expiry eligibility
///
/// Created whenever a checkpoint (or derived artifact) is written;
/// destroyed when the artifact itself is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRecord {
    /// The artifact this record tracks (a checkpoint's run id)
    pub artifact_id: String,
    pub user_id: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl RetentionRecord {
    pub fn new(
        artifact_id: impl Into<String>,
        user_id: impl Into<String>,
        category: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            user_id: user_id.into(),
            category: category.into(),
            created_at,
        }
    }
}

/// Aggregate statistics over tracked retention records
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetentionStats {
    pub total_records: usize,
    pub records_by_category: HashMap<String, usize>,
    pub records_by_user: HashMap<String, usize>,
    pub oldest_record: Option<DateTime<Utc>>,
    pub newest_record: Option<DateTime<Utc>>,
}

/// Outcome of an expiry cleanup sweep
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CleanupReport {
    pub deleted_count: usize,
}
