//! Graph executor: the state machine that drives a conversation run
//!
//! One run is a single logical sequence of asynchronous steps: nodes
//! execute strictly one after another for a given run id, while any number
//! of runs proceed concurrently with no shared mutable state beyond the
//! checkpoint store. The executor owns the authoritative [`AgentState`],
//! applies each node's delta, persists a checkpoint after every node, and
//! consults the pure routing predicates to elect the next stage:
//!
//! ```text
//! SplitRewrite ──> Retrieve ──┬──> DynamicWiden ──> Retrieve (once)
//!                             ├──> ToolRouter ──┬──> RunTool ──┐
//!                             │                 └──────────────┤
//!                             └──> GenerateAnswer <────────────┘
//! ```
//!
//! Both entry points come in blocking and streaming flavors. Streaming is
//! a channel between the executor and the transport: each completed node
//! pushes an incremental snapshot, the terminal snapshot carries
//! `is_final_state`, and dropping the receiver cancels the run
//! cooperatively at the next node boundary.
//!
//! A mid-run checkpoint write failure is logged and the run continues
//! memory-only; the next resumption simply starts cold. Only an
//! unreachable store at initialization is fatal.

use crate::config::EngineConfig;
use crate::nodes::{
    NODE_DYNAMIC_WIDEN, NODE_GENERATE_ANSWER, NODE_RETRIEVE, NODE_RUN_TOOL, NODE_SPLIT_REWRITE,
    NODE_TOOL_ROUTER,
};
use crate::routing::{route_after_retrieve, route_after_tool, RetrieveRoute, ToolRoute};
use ragweave_checkpoint::{new_run_id, CheckpointStore, RunId};
use ragweave_core::{
    run_node, AgentState, CancelSignal, EngineError, LanguageModel, Message, Result, Retriever,
    StateDelta, TaskScratch, FALLBACK_ANSWER,
};
use ragweave_tools::{SecureToolExecutor, ToolRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// User attribution applied when a resumption finds no checkpoint
const ANONYMOUS_USER: &str = "anonymous";

/// Pipeline stages; `GenerateAnswer` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SplitRewrite,
    Retrieve,
    DynamicWiden,
    ToolRouter,
    RunTool,
    GenerateAnswer,
}

/// Drives a single user query through the reasoning pipeline
///
/// All collaborators are constructor-injected: one executor per process,
/// no hidden globals, trivially testable with fakes.
#[derive(Clone)]
pub struct GraphExecutor {
    pub(crate) checkpoints: Arc<CheckpointStore>,
    pub(crate) llm: Arc<dyn LanguageModel>,
    pub(crate) retriever: Arc<dyn Retriever>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) tool_executor: Arc<SecureToolExecutor>,
    pub(crate) config: EngineConfig,
}

impl GraphExecutor {
    pub fn new(
        checkpoints: Arc<CheckpointStore>,
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        tools: Arc<ToolRegistry>,
        config: EngineConfig,
    ) -> Self {
        let tool_executor =
            Arc::new(SecureToolExecutor::new(tools.clone()).with_timeout(config.tool_timeout));
        Self {
            checkpoints,
            llm,
            retriever,
            tools,
            tool_executor,
            config,
        }
    }

    /// Run the pipeline to completion, returning the run id and final state
    pub async fn run(&self, initial_state: AgentState) -> Result<(RunId, AgentState)> {
        let run_id = new_run_id();
        let state = self
            .run_with_id(&run_id, initial_state, CancelSignal::new())
            .await?;
        Ok((run_id, state))
    }

    /// Run under a caller-chosen run id and cancellation signal
    pub async fn run_with_id(
        &self,
        run_id: &str,
        initial_state: AgentState,
        cancel: CancelSignal,
    ) -> Result<AgentState> {
        self.drive(run_id.to_string(), initial_state, cancel, None)
            .await
    }

    /// Resume a run from its checkpoint, optionally appending a new user turn
    ///
    /// A missing or undecryptable checkpoint is a cold start: the pipeline
    /// runs over a fresh state containing only the new message.
    pub async fn resume(&self, run_id: &str, new_message: Option<String>) -> Result<AgentState> {
        let state = self.restore_state(run_id, new_message).await?;
        self.drive(run_id.to_string(), state, CancelSignal::new(), None)
            .await
    }

    /// Streaming variant of [`run`](Self::run): each completed node pushes
    /// an incremental snapshot
    pub fn stream(&self, initial_state: AgentState) -> (RunId, ReceiverStream<AgentState>) {
        let run_id = new_run_id();
        let (tx, rx) = mpsc::channel(self.config.stream_capacity);
        let executor = self.clone();
        let id = run_id.clone();
        tokio::spawn(async move {
            if let Err(error) = executor
                .drive(id.clone(), initial_state, CancelSignal::new(), Some(tx))
                .await
            {
                warn!(run_id = %id, error = %error, "streamed run ended early");
            }
        });
        (run_id, ReceiverStream::new(rx))
    }

    /// Streaming variant of [`resume`](Self::resume)
    pub fn resume_stream(
        &self,
        run_id: &str,
        new_message: Option<String>,
    ) -> ReceiverStream<AgentState> {
        let (tx, rx) = mpsc::channel(self.config.stream_capacity);
        let executor = self.clone();
        let id = run_id.to_string();
        tokio::spawn(async move {
            let outcome = match executor.restore_state(&id, new_message).await {
                Ok(state) => {
                    executor
                        .drive(id.clone(), state, CancelSignal::new(), Some(tx))
                        .await
                }
                Err(error) => Err(error),
            };
            if let Err(error) = outcome {
                warn!(run_id = %id, error = %error, "streamed resumption ended early");
            }
        });
        ReceiverStream::new(rx)
    }

    /// Load and reset a checkpointed state for a fresh invocation
    async fn restore_state(
        &self,
        run_id: &str,
        new_message: Option<String>,
    ) -> Result<AgentState> {
        self.checkpoints.initialize().await?;

        let mut state = match self.checkpoints.get(run_id).await? {
            Some(checkpoint) => match serde_json::from_value::<AgentState>(checkpoint.state) {
                Ok(state) => {
                    debug!(run_id, version = checkpoint.version, "run restored from checkpoint");
                    state
                }
                Err(error) => {
                    warn!(run_id, error = %error, "checkpoint state unreadable, starting cold");
                    AgentState::new(ANONYMOUS_USER)
                }
            },
            None => {
                debug!(run_id, "no checkpoint found, starting cold");
                AgentState::new(ANONYMOUS_USER)
            }
        };

        // The restored history is the input to a fresh invocation: scratch,
        // docs and per-invocation metadata start over, accumulated errors
        // and token counts survive.
        state.tasks = TaskScratch::default();
        state.docs.clear();
        state.generated_text = None;
        state.metadata.node_timings.clear();
        state.metadata.is_final_state = false;

        if let Some(content) = new_message {
            state.messages.push(Message::user(content));
        }

        Ok(state)
    }

    /// The core loop: execute, apply, persist, emit, route
    async fn drive(
        &self,
        run_id: RunId,
        mut state: AgentState,
        cancel: CancelSignal,
        emit: Option<mpsc::Sender<AgentState>>,
    ) -> Result<AgentState> {
        self.checkpoints.initialize().await?;
        info!(run_id = %run_id, user_id = %state.user_id, "run started");

        let mut stage = Stage::SplitRewrite;
        loop {
            // Cancellation is cooperative and checked between nodes only.
            if cancel.is_cancelled() {
                info!(run_id = %run_id, "run cancelled");
                return Err(EngineError::Cancelled);
            }

            let delta = match stage {
                Stage::SplitRewrite => {
                    run_node(NODE_SPLIT_REWRITE, self.node_split_rewrite(&state)).await
                }
                Stage::Retrieve => run_node(NODE_RETRIEVE, self.node_retrieve(&state)).await,
                Stage::DynamicWiden => {
                    run_node(NODE_DYNAMIC_WIDEN, self.node_dynamic_widen(&state)).await
                }
                Stage::ToolRouter => {
                    run_node(NODE_TOOL_ROUTER, self.node_tool_router(&state)).await
                }
                Stage::RunTool => {
                    run_node(NODE_RUN_TOOL, self.node_run_tool(&state, &run_id)).await
                }
                Stage::GenerateAnswer => {
                    run_node(NODE_GENERATE_ANSWER, self.node_generate_answer(&state)).await
                }
            };
            state.apply(delta);
            self.persist(&run_id, &state).await;

            if let Some(tx) = &emit {
                if tx.send(state.clone()).await.is_err() {
                    info!(run_id = %run_id, "stream consumer dropped, cancelling run");
                    return Err(EngineError::Cancelled);
                }
            }

            stage = match stage {
                Stage::SplitRewrite => Stage::Retrieve,
                Stage::Retrieve => {
                    match route_after_retrieve(&state, &self.tools.names(), self.config.min_relevance)
                    {
                        RetrieveRoute::Widen => Stage::DynamicWiden,
                        RetrieveRoute::Tool => Stage::ToolRouter,
                        RetrieveRoute::Generate => Stage::GenerateAnswer,
                    }
                }
                Stage::DynamicWiden => Stage::Retrieve,
                Stage::ToolRouter => match route_after_tool(&state) {
                    ToolRoute::RunTool => Stage::RunTool,
                    ToolRoute::Generate => Stage::GenerateAnswer,
                },
                Stage::RunTool => Stage::GenerateAnswer,
                Stage::GenerateAnswer => break,
            };
        }

        // The terminal node substitutes the apology itself, but if it was
        // contained as an error the run must still end with an answer.
        if state.generated_text.is_none() {
            let delta = StateDelta::new()
                .with_generated_text(FALLBACK_ANSWER)
                .push_message(Message::assistant(FALLBACK_ANSWER))
                .mark_final();
            state.apply(delta);
            self.persist(&run_id, &state).await;
            if let Some(tx) = &emit {
                let _ = tx.send(state.clone()).await;
            }
        }

        info!(
            run_id = %run_id,
            errors = state.metadata.errors.len(),
            "run finished"
        );
        Ok(state)
    }

    /// Persist a checkpoint, degrading to memory-only on failure
    async fn persist(&self, run_id: &str, state: &AgentState) {
        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(error) => {
                warn!(run_id, error = %error, "state not serializable, skipping checkpoint");
                return;
            }
        };
        if let Err(error) = self.checkpoints.put(run_id, &state.user_id, value).await {
            warn!(run_id, error = %error, "checkpoint write failed, continuing memory-only");
        }
    }
}
