//! Error types for tool registration, validation and execution

use thiserror::Error;

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur in the tool subsystem
///
/// Validation errors are surfaced to callers as distinct failures; the
/// secure executor folds every variant into a failed
/// [`ToolResult`](ragweave_core::ToolResult) so the pipeline never aborts
/// on a tool problem.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool registered under the requested name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Input failed parameter validation
    #[error("Tool validation failed: {0}")]
    Validation(String),

    /// Tool handler returned an error
    #[error("Tool execution failed: {0}")]
    Execution(String),

    /// Tool handler exceeded the execution timeout
    #[error("Tool execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
