//! Error types for retention operations

use thiserror::Error;

/// Result type for retention operations
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Errors that can occur in the data-retention subsystem
///
/// Unlike conversational failures, these propagate to callers: retention
/// operations are administrative, and an operator needs to know a cleanup
/// did not complete.
#[derive(Error, Debug)]
pub enum RetentionError {
    /// Consent duration outside the accepted range
    #[error("Invalid consent duration: {days} days (must be between {min} and {max})")]
    InvalidDuration { days: i64, min: u32, max: u32 },

    /// Underlying checkpoint store failure
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] ragweave_checkpoint::CheckpointError),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}
