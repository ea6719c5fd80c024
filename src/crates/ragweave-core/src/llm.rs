//! Language-model collaborator interface
//!
//! ragweave is an orchestration engine, not an LLM client library: the core
//! crate defines the narrow trait the pipeline consumes, and users
//! implement it for their chosen provider (a remote API, a local runtime,
//! a test double). The framework stays provider-agnostic.
//!
//! Two rules govern the call path:
//!
//! - every inference call races a hard timeout (default 15 s); on timeout
//!   the call is abandoned and the caller falls back to a fixed string;
//!   no retry is attempted at this layer;
//! - an unavailable model never propagates an error into the pipeline:
//!   call sites use [`call_with_timeout`] and substitute a safe default.

use crate::error::Result;
use crate::state::Message;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Default hard timeout for a single inference call
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed answer substituted when synthesis fails or times out
pub const FALLBACK_ANSWER: &str =
    "I'm sorry, I wasn't able to put together an answer this time. Please try asking again.";

/// Per-call inference options
#[derive(Debug, Clone)]
pub struct LlmOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// Verdict of query complexity analysis
#[derive(Debug, Clone, Default)]
pub struct ComplexityAssessment {
    pub is_complex: bool,

    /// Whether the query would benefit from splitting into sub-queries
    pub should_split: bool,

    /// Suggested sub-queries when `should_split` is set
    pub suggested_queries: Vec<String>,
}

/// Narrow call interface to a chat-capable language model
///
/// Implementations must be `Send + Sync`; share with `Arc<dyn
/// LanguageModel>`. Implementations should surface provider failures as
/// errors; the engine's call sites contain them and fall back.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion over the given message history
    async fn call(&self, messages: &[Message], options: &LlmOptions) -> Result<String>;

    /// Rewrite a raw user query using prior turns for disambiguation
    async fn rewrite_query(&self, query: &str, context: &[Message]) -> Result<String>;

    /// Judge whether a query is complex enough to split
    async fn analyze_complexity(&self, query: &str) -> Result<ComplexityAssessment>;
}

/// Race an inference call against `timeout`
///
/// Returns `None` on timeout or provider error; callers substitute their
/// safe default. The abandoned call is dropped, not retried.
pub async fn call_with_timeout(
    model: &dyn LanguageModel,
    messages: &[Message],
    options: &LlmOptions,
    timeout: Duration,
) -> Option<String> {
    match tokio::time::timeout(timeout, model.call(messages, options)).await {
        Ok(Ok(text)) => Some(text),
        Ok(Err(error)) => {
            warn!(error = %error, "LLM call failed, using fallback");
            None
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "LLM call timed out, using fallback");
            None
        }
    }
}
