//! Secure tool executor: bounded, validated, never-throwing invocation
//!
//! [`SecureToolExecutor::execute`] is the only path from the pipeline into
//! a tool handler. It looks the tool up, validates untrusted input, runs
//! the handler under a hard timeout, and folds every failure mode
//! (unknown tool, validation rejection, handler error, timeout) into a
//! failed [`ToolResult`] instead of returning an error. This is what keeps
//! the engine's "no node ever aborts the run" invariant intact end-to-end:
//! a tool can misbehave arbitrarily and the run still reaches its answer.

use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::validation::validate_input;
use ragweave_core::ToolResult;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default hard timeout for one tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes registry entries against untrusted input
pub struct SecureToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl SecureToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke `name` with `input`, always producing a [`ToolResult`]
    ///
    /// `trace_id` ties the emitted telemetry to the run that requested the
    /// invocation.
    pub async fn execute(&self, name: &str, input: Value, trace_id: &str) -> ToolResult {
        let start = Instant::now();

        let Some(definition) = self.registry.get(name) else {
            warn!(tool = name, trace_id, "tool not found");
            return ToolResult::failure(
                name,
                input,
                ToolError::NotFound(name.to_string()).to_string(),
                start.elapsed().as_millis() as u64,
            );
        };

        let normalized = match validate_input(&definition, &input) {
            Ok(normalized) => normalized,
            Err(error) => {
                warn!(tool = name, trace_id, error = %error, "tool input rejected");
                return ToolResult::failure(
                    name,
                    input,
                    error.to_string(),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        let outcome =
            tokio::time::timeout(self.timeout, definition.handler.run(normalized.clone())).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                debug!(tool = name, trace_id, elapsed_ms, "tool execution succeeded");
                ToolResult::success(name, normalized, output, elapsed_ms)
            }
            Ok(Err(error)) => {
                warn!(tool = name, trace_id, elapsed_ms, error = %error, "tool execution failed");
                ToolResult::failure(name, normalized, error.to_string(), elapsed_ms)
            }
            Err(_) => {
                warn!(tool = name, trace_id, elapsed_ms, "tool execution timed out");
                ToolResult::failure(
                    name,
                    normalized,
                    ToolError::Timeout(self.timeout).to_string(),
                    elapsed_ms,
                )
            }
        }
    }
}
