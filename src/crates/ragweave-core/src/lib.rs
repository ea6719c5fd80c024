//! Core state model and execution primitives for ragweave
//!
//! This crate holds everything the conversational pipeline is built from,
//! without binding any concrete collaborator:
//!
//! - [`AgentState`] / [`StateDelta`]: the unit of work and the pure
//!   partial updates nodes return (the executor owns the authoritative
//!   state and applies deltas)
//! - [`run_node`]: the cross-cutting wrapper applied to every pipeline
//!   step: timing, error containment into state, telemetry emission
//! - [`LanguageModel`] and [`Retriever`]: the narrow collaborator traits
//!   the pipeline consumes; implementations are supplied by the embedding
//!   application
//! - [`CancelSignal`]: cooperative cancellation checked between nodes
//! - [`EngineError`]: the error taxonomy shared by the higher crates

pub mod cancel;
pub mod error;
pub mod llm;
pub mod node;
pub mod retrieval;
pub mod state;

pub use cancel::CancelSignal;
pub use error::{EngineError, Result};
pub use llm::{
    call_with_timeout, ComplexityAssessment, LanguageModel, LlmOptions, DEFAULT_LLM_TIMEOUT,
    FALLBACK_ANSWER,
};
pub use node::run_node;
pub use retrieval::{search_or_empty, Retriever, SearchOptions};
pub use state::{
    AgentState, Document, DocumentMetadata, Message, NodeError, Role, RunMetadata, RunOptions,
    StateDelta, TaskScratch, TokenCounts, ToolOutcome, ToolResult, ToolSelection,
};
