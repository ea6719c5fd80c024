//! Agent state: the unit of work threaded through the pipeline
//!
//! [`AgentState`] carries everything a conversation run accumulates:
//! message history, retrieval results, tool outcomes, timings and errors.
//! Nodes never mutate it directly: each node is a pure function returning
//! a [`StateDelta`], and the executor owns the single authoritative state
//! and applies deltas in sequence. This keeps node logic side-effect-free
//! and independently testable, and makes routing deterministic: the same
//! state always elects the same transition.
//!
//! # Invariants
//!
//! - `user_id` is immutable for the run's lifetime
//! - `messages` is append-only
//! - `metadata.node_timings` has an entry for every node that executed,
//!   including nodes that failed
//! - `metadata.errors` accumulates; a later failure never erases an
//!   earlier record
//! - `generated_text` is set only by the terminal node

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One turn in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Provenance and scoring attached to a retrieved document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Which corpus or connector the document came from
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Ranking score reported by the retrieval backend, higher is better
    pub relevance_score: f64,
}

/// A retrieved document candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub metadata: DocumentMetadata,
}

/// Outcome of a single tool invocation
///
/// Exactly one variant is meaningful per invocation; there is no
/// "succeeded with an error" state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(serde_json::Value),
    Failure(String),
}

/// Record of one tool invocation, success or failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub input: serde_json::Value,
    pub outcome: ToolOutcome,
    pub execution_time_ms: u64,
}

impl ToolResult {
    pub fn success(
        tool_name: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            outcome: ToolOutcome::Success(output),
            execution_time_ms,
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        input: serde_json::Value,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            outcome: ToolOutcome::Failure(error.into()),
            execution_time_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// The output value, if the invocation succeeded
    pub fn output(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ToolOutcome::Success(value) => Some(value),
            ToolOutcome::Failure(_) => None,
        }
    }

    /// The error message, if the invocation failed
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure(message) => Some(message),
        }
    }
}

/// A tool elected by the router, with the input it should receive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSelection {
    pub name: String,
    pub input: serde_json::Value,
}

/// Mutable scratch space for intermediate pipeline results
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskScratch {
    /// Query after normalization/rewriting, if the rewrite step ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,

    /// Sub-queries suggested by complexity analysis, folded into widening
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sub_queries: Vec<String>,

    /// Tool the router elected to run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tool: Option<ToolSelection>,

    /// Accumulated tool invocation records
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_results: Vec<ToolResult>,

    /// Latch: retrieval constraints have been relaxed once already
    #[serde(default)]
    pub widened: bool,
}

/// One contained node failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeError {
    pub node: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NodeError {
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Token accounting across LLM calls
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
}

impl TokenCounts {
    pub fn add(&mut self, other: TokenCounts) {
        self.prompt += other.prompt;
        self.completion += other.completion;
    }

    pub fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

/// Per-run execution metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub start_time: DateTime<Utc>,

    /// Wall-clock duration per executed node, in milliseconds. Every node
    /// that ran has an entry here, failed nodes included.
    pub node_timings: BTreeMap<String, u64>,

    pub token_counts: TokenCounts,

    /// Accumulated node failures, never overwritten
    pub errors: Vec<NodeError>,

    /// Set by the terminal node
    pub is_final_state: bool,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            start_time: Utc::now(),
            node_timings: BTreeMap::new(),
            token_counts: TokenCounts::default(),
            errors: Vec::new(),
            is_final_state: false,
        }
    }
}

/// Caller-supplied knobs for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Whether retrieved context is folded into answer synthesis
    pub context_enhancement: bool,

    /// Maximum number of documents kept after retrieval
    pub max_context_docs: usize,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            context_enhancement: true,
            max_context_docs: 5,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// The unit of work threaded through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Immutable for the run's lifetime
    pub user_id: String,

    /// Conversation history, append-only
    pub messages: Vec<Message>,

    pub tasks: TaskScratch,

    /// Retrieved document candidates, replaced wholesale by retrieval nodes
    pub docs: Vec<Document>,

    /// Final answer text, set only by the terminal node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,

    pub metadata: RunMetadata,

    pub options: RunOptions,
}

impl AgentState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            tasks: TaskScratch::default(),
            docs: Vec::new(),
            generated_text: None,
            metadata: RunMetadata::default(),
            options: RunOptions::default(),
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Content of the most recent user turn, if any
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The query retrieval should run: the rewrite when present, otherwise
    /// the raw latest user turn.
    pub fn effective_query(&self) -> Option<&str> {
        self.tasks
            .rewritten_query
            .as_deref()
            .or_else(|| self.latest_user_message())
    }

    /// Apply a node's delta to the authoritative state
    pub fn apply(&mut self, delta: StateDelta) {
        if let Some(query) = delta.rewritten_query {
            self.tasks.rewritten_query = Some(query);
        }
        if let Some(sub_queries) = delta.sub_queries {
            self.tasks.sub_queries = sub_queries;
        }
        if let Some(selection) = delta.selected_tool {
            self.tasks.selected_tool = Some(selection);
        }
        if delta.widened {
            self.tasks.widened = true;
        }
        self.tasks.tool_results.extend(delta.tool_results);
        if let Some(docs) = delta.docs {
            self.docs = docs;
        }
        self.messages.extend(delta.messages);
        if let Some(text) = delta.generated_text {
            self.generated_text = Some(text);
        }
        if let Some((node, millis)) = delta.node_timing {
            self.metadata.node_timings.insert(node, millis);
        }
        self.metadata.errors.extend(delta.errors);
        if let Some(counts) = delta.token_counts {
            self.metadata.token_counts.add(counts);
        }
        if delta.is_final_state {
            self.metadata.is_final_state = true;
        }
    }
}

/// The partial state update a node returns
///
/// Every field is either absent (no change) or an append/replace the
/// executor applies via [`AgentState::apply`]. Nodes construct deltas with
/// the builder methods and never touch the running state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_queries: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tool: Option<ToolSelection>,

    #[serde(default)]
    pub widened: bool,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_results: Vec<ToolResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Document>>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_timing: Option<(String, u64)>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<NodeError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_counts: Option<TokenCounts>,

    #[serde(default)]
    pub is_final_state: bool,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewritten_query(mut self, query: impl Into<String>) -> Self {
        self.rewritten_query = Some(query.into());
        self
    }

    pub fn with_sub_queries(mut self, queries: Vec<String>) -> Self {
        self.sub_queries = Some(queries);
        self
    }

    pub fn with_selected_tool(mut self, selection: ToolSelection) -> Self {
        self.selected_tool = Some(selection);
        self
    }

    pub fn with_widened(mut self) -> Self {
        self.widened = true;
        self
    }

    pub fn with_docs(mut self, docs: Vec<Document>) -> Self {
        self.docs = Some(docs);
        self
    }

    pub fn push_tool_result(mut self, result: ToolResult) -> Self {
        self.tool_results.push(result);
        self
    }

    pub fn push_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_generated_text(mut self, text: impl Into<String>) -> Self {
        self.generated_text = Some(text.into());
        self
    }

    pub fn push_error(mut self, error: NodeError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_token_counts(mut self, counts: TokenCounts) -> Self {
        self.token_counts = Some(counts);
        self
    }

    pub fn mark_final(mut self) -> Self {
        self.is_final_state = true;
        self
    }
}
