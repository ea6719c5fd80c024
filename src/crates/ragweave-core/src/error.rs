//! Error types for engine operations
//!
//! # Error Taxonomy
//!
//! ```text
//! EngineError
//! ├── Validation         - Malformed caller input, rejected immediately
//! ├── NodeExecution      - A pipeline node failed (absorbed by the wrapper)
//! ├── Llm                - Language-model collaborator failure
//! ├── Retrieval          - Search collaborator failure
//! ├── Checkpoint         - Persistence errors
//! ├── Serialization      - JSON errors
//! ├── Timeout            - A bounded operation exceeded its deadline
//! ├── Cancelled          - Caller cancelled the run between nodes
//! └── Custom             - Application-defined errors
//! ```
//!
//! Node failures are recoverable by design: the node wrapper converts them
//! into `metadata.errors` entries and the run continues. Validation and
//! administrative errors propagate to the caller unabsorbed.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while driving a conversation run
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A pipeline node failed
    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    /// Language-model collaborator failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval collaborator failure
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Persistence error
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] ragweave_checkpoint::CheckpointError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A bounded operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Caller cancelled the run
    #[error("Run cancelled")]
    Cancelled,

    /// Custom error
    #[error("{0}")]
    Custom(String),
}
