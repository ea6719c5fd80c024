//! Engine configuration

use std::time::Duration;

/// Tunables for the graph executor and service surface
///
/// Everything has a sensible default; construct with `..Default::default()`
/// and override what you need.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard timeout for a single LLM inference call
    pub llm_timeout: Duration,

    /// Hard timeout for a single tool invocation
    pub tool_timeout: Duration,

    /// Retrieval results scoring below this are considered unsatisfactory
    /// and trigger the widening pass
    pub min_relevance: f64,

    /// Buffer size of the node-snapshot channel used for streaming
    pub stream_capacity: usize,

    /// Age threshold applied by the administrative checkpoint cleanup
    pub checkpoint_max_age: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_timeout: ragweave_core::DEFAULT_LLM_TIMEOUT,
            tool_timeout: ragweave_tools::DEFAULT_TOOL_TIMEOUT,
            min_relevance: 0.35,
            stream_capacity: 16,
            checkpoint_max_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}
