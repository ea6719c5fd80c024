//! Integration tests for complete conversation runs
//!
//! These tests drive the full pipeline with fake collaborators and verify
//! the end-to-end guarantees: every run reaches an answer, routing widens
//! at most once, tool failures stay contained, deletion is exhaustive and
//! resumption after deletion starts cold.

use async_trait::async_trait;
use futures::StreamExt;
use ragweave_checkpoint::{CheckpointStore, CipherKey, MemoryBackend, KEY_LEN};
use ragweave_core::{
    AgentState, CancelSignal, ComplexityAssessment, Document, DocumentMetadata, EngineError,
    LanguageModel, LlmOptions, Message, Result as CoreResult, Retriever, Role, SearchOptions,
};
use ragweave_engine::{ChatRequest, ChatService, EngineConfig, GraphExecutor};
use ragweave_retention::{DataRetentionManager, RetentionError};
use ragweave_tools::{ToolDefinition, ToolHandler, ToolParameter, ToolRegistry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted language model: fixed answer, fixed tool verdict
struct MockModel {
    answer: String,
    tool_verdict: Option<String>,
}

impl MockModel {
    fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            tool_verdict: None,
        }
    }

    fn with_tool_verdict(mut self, verdict: &str) -> Self {
        self.tool_verdict = Some(verdict.to_string());
        self
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn call(&self, messages: &[Message], _options: &LlmOptions) -> CoreResult<String> {
        let is_router_prompt = messages
            .first()
            .map(|m| m.role == Role::System && m.content.contains("Available tools"))
            .unwrap_or(false);
        if is_router_prompt {
            return Ok(self.tool_verdict.clone().unwrap_or_else(|| "none".to_string()));
        }
        Ok(self.answer.clone())
    }

    async fn rewrite_query(&self, query: &str, _context: &[Message]) -> CoreResult<String> {
        Ok(query.to_string())
    }

    async fn analyze_complexity(&self, _query: &str) -> CoreResult<ComplexityAssessment> {
        Ok(ComplexityAssessment::default())
    }
}

/// Retriever returning a fixed result set, counting invocations
struct MockRetriever {
    docs: Vec<Document>,
    calls: AtomicUsize,
}

impl MockRetriever {
    fn returning(docs: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            docs,
            calls: AtomicUsize::new(0),
        })
    }

    fn empty() -> Arc<Self> {
        Self::returning(Vec::new())
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn search(
        &self,
        _user_id: &str,
        _query: &str,
        _options: &SearchOptions,
    ) -> CoreResult<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.clone())
    }
}

fn doc(id: &str, score: f64) -> Document {
    Document {
        id: id.to_string(),
        title: format!("Document {}", id),
        body: "Relevant content.".to_string(),
        metadata: DocumentMetadata {
            source: "corpus".to_string(),
            url: None,
            relevance_score: score,
        },
    }
}

struct AddHandler;

#[async_trait]
impl ToolHandler for AddHandler {
    async fn run(&self, input: Value) -> ragweave_tools::Result<Value> {
        let a = input["a"].as_f64().unwrap_or(0.0);
        let b = input["b"].as_f64().unwrap_or(0.0);
        Ok(json!({"result": a + b}))
    }
}

struct HangingHandler;

#[async_trait]
impl ToolHandler for HangingHandler {
    async fn run(&self, _input: Value) -> ragweave_tools::Result<Value> {
        tokio::time::sleep(Duration::from_secs(300)).await;
        Ok(json!(null))
    }
}

fn checkpoint_store() -> Arc<CheckpointStore> {
    Arc::new(CheckpointStore::new(
        Arc::new(MemoryBackend::new()),
        CipherKey::from_bytes([0x42; KEY_LEN]),
    ))
}

fn executor_with(
    model: MockModel,
    retriever: Arc<MockRetriever>,
    registry: ToolRegistry,
    config: EngineConfig,
) -> (Arc<CheckpointStore>, GraphExecutor) {
    let checkpoints = checkpoint_store();
    let executor = GraphExecutor::new(
        checkpoints.clone(),
        Arc::new(model),
        retriever,
        Arc::new(registry),
        config,
    );
    (checkpoints, executor)
}

fn service_around(checkpoints: Arc<CheckpointStore>, executor: GraphExecutor) -> ChatService {
    let retention = Arc::new(DataRetentionManager::new(checkpoints.clone()));
    ChatService::new(executor, checkpoints, retention)
}

fn hello_state() -> AgentState {
    AgentState::new("u1").with_message(Message::user("Hello, world!"))
}

#[tokio::test]
async fn test_hello_world_scenario() {
    let (_, executor) = executor_with(
        MockModel::answering("Hello! How can I help?"),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let (_, state) = executor.run(hello_state()).await.unwrap();

    assert_eq!(state.generated_text.as_deref(), Some("Hello! How can I help?"));
    assert!(state.metadata.is_final_state);
    for node in ["split_rewrite", "retrieve", "generate_answer"] {
        assert!(
            state.metadata.node_timings.contains_key(node),
            "missing timing for {}",
            node
        );
    }
    // Answer is appended to the history as an assistant turn.
    assert_eq!(state.messages.last().unwrap().role, Role::Assistant);
    assert!(state.metadata.token_counts.total() > 0);
}

#[tokio::test]
async fn test_failing_node_still_reaches_answer() {
    // No user message: split_rewrite fails. The wrapper contains it and the
    // run must still end with a non-empty answer.
    let (_, executor) = executor_with(
        MockModel::answering("Answer despite trouble."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let (_, state) = executor.run(AgentState::new("u1")).await.unwrap();

    assert!(!state.generated_text.as_deref().unwrap_or("").is_empty());
    assert!(state.metadata.is_final_state);
    assert!(!state.metadata.errors.is_empty());
    assert_eq!(state.metadata.errors[0].node, "split_rewrite");
    // Failed nodes are timed too.
    assert!(state.metadata.node_timings.contains_key("split_rewrite"));
    assert!(state.metadata.node_timings.contains_key("generate_answer"));
}

#[tokio::test]
async fn test_empty_retrieval_widens_exactly_once() {
    let retriever = MockRetriever::empty();
    let (_, executor) = executor_with(
        MockModel::answering("Best effort answer."),
        retriever.clone(),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let (_, state) = executor
        .run(AgentState::new("u1").with_message(Message::user(r#""rare phrase" site:nowhere.invalid"#)))
        .await
        .unwrap();

    // One initial pass plus one widened pass, then straight to the answer
    // even though the widened pass was still empty.
    assert_eq!(retriever.call_count(), 2);
    assert!(state.tasks.widened);
    assert!(state.metadata.node_timings.contains_key("dynamic_widen"));
    assert!(state.metadata.is_final_state);
    assert!(state.generated_text.is_some());
}

#[tokio::test]
async fn test_tool_success_path() {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::builder("add", "Add two numbers")
            .category("calculation")
            .parameter(ToolParameter::number("a", true))
            .parameter(ToolParameter::number("b", true))
            .example("add two and three", json!({"a": 2, "b": 3}))
            .handler(AddHandler)
            .build(),
    );

    let model = MockModel::answering("The sum is 5.")
        .with_tool_verdict(r#"{"tool": "add", "input": {"a": 2, "b": 3}}"#);
    let (_, executor) = executor_with(
        model,
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        registry,
        EngineConfig::default(),
    );

    let (_, state) = executor
        .run(AgentState::new("u1").with_message(Message::user("please add 2 and 3")))
        .await
        .unwrap();

    assert_eq!(state.tasks.tool_results.len(), 1);
    let result = &state.tasks.tool_results[0];
    assert!(result.is_success());
    assert_eq!(result.output().unwrap()["result"], 5.0);
    assert!(state.metadata.node_timings.contains_key("tool_router"));
    assert!(state.metadata.node_timings.contains_key("run_tool"));
    assert_eq!(state.generated_text.as_deref(), Some("The sum is 5."));
}

#[tokio::test]
async fn test_tool_timeout_still_produces_answer() {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::builder("add", "Add two numbers, slowly")
            .handler(HangingHandler)
            .build(),
    );

    let model = MockModel::answering("Here is what I know anyway.")
        .with_tool_verdict(r#"{"tool": "add", "input": {}}"#);
    let config = EngineConfig {
        tool_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let (_, executor) = executor_with(
        model,
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        registry,
        config,
    );

    let (_, state) = executor
        .run(AgentState::new("u1").with_message(Message::user("please add these numbers")))
        .await
        .unwrap();

    let result = &state.tasks.tool_results[0];
    assert!(result.output().is_none());
    assert!(result.error().unwrap().contains("timed out"));
    assert!(state.metadata.is_final_state);
    assert!(state.generated_text.is_some());
}

#[tokio::test]
async fn test_unparseable_tool_verdict_falls_through_to_answer() {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::builder("add", "Add two numbers")
            .handler(AddHandler)
            .build(),
    );

    let model = MockModel::answering("No tool needed.").with_tool_verdict("absolutely not json");
    let (_, executor) = executor_with(
        model,
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        registry,
        EngineConfig::default(),
    );

    let (_, state) = executor
        .run(AgentState::new("u1").with_message(Message::user("please add 2 and 3")))
        .await
        .unwrap();

    assert!(state.tasks.tool_results.is_empty());
    assert_eq!(state.generated_text.as_deref(), Some("No tool needed."));
}

#[tokio::test]
async fn test_resume_continues_history() -> anyhow::Result<()> {
    let (_, executor) = executor_with(
        MockModel::answering("Follow-up answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let (run_id, first) = executor.run(hello_state()).await?;
    assert_eq!(first.messages.len(), 2);

    let resumed = executor
        .resume(&run_id, Some("And a second question?".to_string()))
        .await?;

    // user, assistant, user, assistant
    assert_eq!(resumed.messages.len(), 4);
    assert_eq!(resumed.user_id, "u1");
    assert_eq!(resumed.messages[2].content, "And a second question?");
    assert!(resumed.metadata.is_final_state);
    Ok(())
}

#[tokio::test]
async fn test_delete_user_data_then_resume_is_cold_start() {
    let (checkpoints, executor) = executor_with(
        MockModel::answering("An answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );
    let service = service_around(checkpoints, executor);

    let response = service
        .generate_chat_response(ChatRequest::new(hello_state()))
        .await
        .unwrap();

    let deleted = service.delete_user_data("u1").await.unwrap();
    assert_eq!(deleted, 1);

    let stats = service.get_checkpoint_stats().await.unwrap();
    assert!(!stats.checkpoints_by_user.contains_key("u1"));

    // Resuming the purged run id behaves as a cold start: only the new
    // message and its answer, no prior history, no attribution to u1.
    let resumed = service
        .resume_chat_session(&response.run_id, Some("Hello again".to_string()))
        .await
        .unwrap();
    assert_eq!(resumed.state.messages.len(), 2);
    assert_eq!(resumed.state.messages[0].content, "Hello again");
    assert_ne!(resumed.state.user_id, "u1");
}

#[tokio::test]
async fn test_streaming_emits_snapshots_with_terminal_marker() {
    let (_, executor) = executor_with(
        MockModel::answering("Streamed answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let (_, stream) = executor.stream(hello_state());
    let snapshots: Vec<AgentState> = stream.collect().await;

    assert!(snapshots.len() >= 3);
    assert!(!snapshots[0].metadata.is_final_state);
    let last = snapshots.last().unwrap();
    assert!(last.metadata.is_final_state);
    assert_eq!(last.generated_text.as_deref(), Some("Streamed answer."));
}

#[tokio::test]
async fn test_cancellation_between_nodes() {
    let (_, executor) = executor_with(
        MockModel::answering("Never reached."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );

    let cancel = CancelSignal::new();
    cancel.cancel();
    let outcome = executor
        .run_with_id("run-cancelled", hello_state(), cancel)
        .await;

    assert!(matches!(outcome, Err(EngineError::Cancelled)));
}

#[tokio::test]
async fn test_consent_validation_via_service() {
    let (checkpoints, executor) = executor_with(
        MockModel::answering("An answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );
    let service = service_around(checkpoints, executor);

    assert!(matches!(
        service.record_consent("u1", "conversation", 0).await,
        Err(RetentionError::InvalidDuration { .. })
    ));
    assert!(matches!(
        service.record_consent("u1", "conversation", 1826).await,
        Err(RetentionError::InvalidDuration { .. })
    ));
    assert!(service.record_consent("u1", "conversation", 30).await.is_ok());
}

#[tokio::test]
async fn test_cleanup_expired_data_is_idempotent_via_service() {
    let (checkpoints, executor) = executor_with(
        MockModel::answering("An answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );
    let service = service_around(checkpoints, executor);

    service
        .generate_chat_response(ChatRequest::new(hello_state()))
        .await
        .unwrap();

    // Fresh records are inside the retention window: nothing expires, and
    // a second sweep finds nothing new either.
    let first = service.cleanup_expired_data().await.unwrap();
    assert_eq!(first.deleted_count, 0);
    let second = service.cleanup_expired_data().await.unwrap();
    assert_eq!(second.deleted_count, 0);
}

#[tokio::test]
async fn test_checkpoint_stats_reflect_runs() {
    let (checkpoints, executor) = executor_with(
        MockModel::answering("An answer."),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        ToolRegistry::new(),
        EngineConfig::default(),
    );
    let service = service_around(checkpoints, executor);

    service
        .generate_chat_response(ChatRequest::new(hello_state()))
        .await
        .unwrap();
    service
        .generate_chat_response(ChatRequest::new(
            AgentState::new("u2").with_message(Message::user("Hi")),
        ))
        .await
        .unwrap();

    let stats = service.get_checkpoint_stats().await.unwrap();
    assert_eq!(stats.total_checkpoints, 2);
    assert_eq!(stats.checkpoints_by_user["u1"], 1);
    assert_eq!(stats.checkpoints_by_user["u2"], 1);
    assert!(stats.average_state_size > 0.0);
}

/// Backend whose writes always fail after a healthy initialization
struct WriteFailingBackend;

#[async_trait]
impl ragweave_checkpoint::StorageBackend for WriteFailingBackend {
    async fn ping(&self) -> ragweave_checkpoint::Result<()> {
        Ok(())
    }

    async fn read(&self, _key: &str) -> ragweave_checkpoint::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn write(&self, _key: &str, _value: Vec<u8>) -> ragweave_checkpoint::Result<()> {
        Err(ragweave_checkpoint::CheckpointError::Storage(
            "disk full".to_string(),
        ))
    }

    async fn remove(&self, _key: &str) -> ragweave_checkpoint::Result<bool> {
        Ok(false)
    }

    async fn keys(&self) -> ragweave_checkpoint::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_checkpoint_write_failure_degrades_to_memory_only() {
    let checkpoints = Arc::new(CheckpointStore::new(
        Arc::new(WriteFailingBackend),
        CipherKey::from_bytes([0x42; KEY_LEN]),
    ));
    let executor = GraphExecutor::new(
        checkpoints,
        Arc::new(MockModel::answering("Still answered.")),
        MockRetriever::returning(vec![doc("d1", 0.9)]),
        Arc::new(ToolRegistry::new()),
        EngineConfig::default(),
    );

    // Every checkpoint write fails; the run must still complete.
    let (_, state) = executor.run(hello_state()).await.unwrap();
    assert_eq!(state.generated_text.as_deref(), Some("Still answered."));
    assert!(state.metadata.is_final_state);
}
