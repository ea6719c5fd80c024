//! Transport-agnostic chat service surface
//!
//! [`ChatService`] is the RPC-style facade the engine exposes to whatever
//! transport hosts it (HTTP, gRPC, a test harness). It owns nothing the
//! executor does not already own; it wires the conversational entry points
//! to the data-lifecycle bookkeeping and forwards the administrative
//! operations.
//!
//! Failure handling splits by audience:
//!
//! - conversational calls degrade inside the pipeline (a failed node, a
//!   dead collaborator or a synthesis timeout all end in the apology
//!   answer, not an error);
//! - administrative calls (stats, cleanup, deletion, consent) propagate
//!   errors, because their callers are operators who need to know a
//!   cleanup did not complete.

use crate::config::EngineConfig;
use crate::executor::GraphExecutor;
use chrono::Utc;
use ragweave_checkpoint::{new_run_id, CheckpointStats, CheckpointStore, RunId};
use ragweave_core::{AgentState, CancelSignal};
use ragweave_retention::{CleanupReport, DataRetentionManager, RetentionStats};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

/// Data category under which conversation checkpoints are retained
pub const CONVERSATION_CATEGORY: &str = "conversation";

/// A request to drive one user turn through the pipeline
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub initial_state: AgentState,

    /// Caller-chosen run id; generated when absent
    pub run_id: Option<RunId>,
}

impl ChatRequest {
    pub fn new(initial_state: AgentState) -> Self {
        Self {
            initial_state,
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// The materialized outcome of a run
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub run_id: RunId,
    pub state: AgentState,
}

/// RPC-style surface over the executor, checkpoint store and retention
/// manager
pub struct ChatService {
    executor: GraphExecutor,
    checkpoints: Arc<CheckpointStore>,
    retention: Arc<DataRetentionManager>,
}

impl ChatService {
    pub fn new(
        executor: GraphExecutor,
        checkpoints: Arc<CheckpointStore>,
        retention: Arc<DataRetentionManager>,
    ) -> Self {
        Self {
            executor,
            checkpoints,
            retention,
        }
    }

    fn config(&self) -> &EngineConfig {
        &self.executor.config
    }

    /// Drive one user turn to completion (blocking flavor)
    pub async fn generate_chat_response(
        &self,
        request: ChatRequest,
    ) -> ragweave_core::Result<ChatResponse> {
        let run_id = request.run_id.unwrap_or_else(new_run_id);
        let user_id = request.initial_state.user_id.clone();

        let state = self
            .executor
            .run_with_id(&run_id, request.initial_state, CancelSignal::new())
            .await?;

        self.retention
            .register_data_record(&run_id, &user_id, CONVERSATION_CATEGORY, Utc::now())
            .await;

        Ok(ChatResponse { run_id, state })
    }

    /// Drive one user turn, streaming a snapshot per completed node
    pub async fn generate_chat_response_stream(
        &self,
        request: ChatRequest,
    ) -> (RunId, ReceiverStream<AgentState>) {
        let user_id = request.initial_state.user_id.clone();
        let (run_id, stream) = self.executor.stream(request.initial_state);

        self.retention
            .register_data_record(&run_id, &user_id, CONVERSATION_CATEGORY, Utc::now())
            .await;

        (run_id, stream)
    }

    /// Resume a prior run, optionally appending a new user message
    ///
    /// A deleted or expired run id behaves as a cold start. Resumption
    /// refreshes the run's retention record: new activity restarts the
    /// retention window.
    pub async fn resume_chat_session(
        &self,
        run_id: &str,
        new_message: Option<String>,
    ) -> ragweave_core::Result<ChatResponse> {
        let state = self.executor.resume(run_id, new_message).await?;

        self.retention
            .register_data_record(run_id, &state.user_id, CONVERSATION_CATEGORY, Utc::now())
            .await;

        Ok(ChatResponse {
            run_id: run_id.to_string(),
            state,
        })
    }

    /// Streaming flavor of [`resume_chat_session`](Self::resume_chat_session)
    pub fn resume_chat_session_stream(
        &self,
        run_id: &str,
        new_message: Option<String>,
    ) -> ReceiverStream<AgentState> {
        self.executor.resume_stream(run_id, new_message)
    }

    /// Aggregate checkpoint statistics
    pub async fn get_checkpoint_stats(&self) -> ragweave_checkpoint::Result<CheckpointStats> {
        self.checkpoints.get_stats().await
    }

    /// Delete checkpoints older than the configured age threshold
    pub async fn cleanup_checkpoints(&self) -> ragweave_checkpoint::Result<usize> {
        self.checkpoints
            .cleanup(self.config().checkpoint_max_age)
            .await
    }

    /// Aggregate retention statistics
    pub async fn get_data_retention_stats(&self) -> RetentionStats {
        self.retention.get_stats().await
    }

    /// Delete every artifact whose retention window has passed
    pub async fn cleanup_expired_data(&self) -> ragweave_retention::Result<CleanupReport> {
        self.retention.cleanup_expired_data().await
    }

    /// Unconditional purge of everything attributed to a user
    pub async fn delete_user_data(&self, user_id: &str) -> ragweave_retention::Result<usize> {
        self.retention.delete_user_data(user_id).await
    }

    /// Record a consent grant for a data category
    pub async fn record_consent(
        &self,
        user_id: &str,
        category: &str,
        duration_days: u32,
    ) -> ragweave_retention::Result<()> {
        self.retention
            .record_consent(user_id, category, duration_days)
            .await
    }
}
