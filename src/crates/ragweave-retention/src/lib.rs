//! Consent tracking and data-lifecycle cleanup for ragweave
//!
//! Conversation checkpoints are user data with retention obligations. This
//! crate tracks what was stored for whom ([`RetentionRecord`]), how long
//! the user agreed to keep it ([`ConsentRecord`]), and performs the two
//! bulk lifecycle operations: expiry-based cleanup and unconditional
//! per-user purge. The [`DataRetentionManager`] operates out-of-band
//! against the same checkpoint store active conversations use.

pub mod error;
pub mod manager;
pub mod records;

pub use error::{RetentionError, Result};
pub use manager::DataRetentionManager;
pub use records::{
    CleanupReport, ConsentRecord, RetentionRecord, RetentionStats, DEFAULT_RETENTION_DAYS,
    MAX_CONSENT_DAYS, MIN_CONSENT_DAYS,
};
