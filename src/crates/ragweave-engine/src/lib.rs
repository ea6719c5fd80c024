//! Conversational retrieval-orchestration engine
//!
//! This crate assembles the ragweave pipeline: a deterministic sequence of
//! reasoning steps (query rewriting, retrieval, adaptive widening, tool
//! selection and execution, answer synthesis) driven by the
//! [`GraphExecutor`], persisted through the encrypted checkpoint store,
//! and exposed to transports via the [`ChatService`] facade.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use ragweave_engine::{ChatRequest, ChatService, EngineConfig, GraphExecutor};
//! use ragweave_checkpoint::{CheckpointStore, CipherKey, MemoryBackend, KEY_LEN};
//! use ragweave_core::{AgentState, Message};
//! use ragweave_retention::DataRetentionManager;
//! use ragweave_tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! let checkpoints = Arc::new(CheckpointStore::new(
//!     Arc::new(MemoryBackend::new()),
//!     CipherKey::from_bytes([7u8; KEY_LEN]),
//! ));
//! let executor = GraphExecutor::new(
//!     checkpoints.clone(),
//!     Arc::new(my_language_model),   // impl ragweave_core::LanguageModel
//!     Arc::new(my_retriever),        // impl ragweave_core::Retriever
//!     Arc::new(ToolRegistry::new()),
//!     EngineConfig::default(),
//! );
//! let service = ChatService::new(
//!     executor,
//!     checkpoints.clone(),
//!     Arc::new(DataRetentionManager::new(checkpoints)),
//! );
//!
//! let state = AgentState::new("user-1").with_message(Message::user("Hello, world!"));
//! let response = service.generate_chat_response(ChatRequest::new(state)).await?;
//! assert!(response.state.generated_text.is_some());
//! ```

pub mod config;
pub mod executor;
mod nodes;
pub mod routing;
pub mod service;

pub use config::EngineConfig;
pub use executor::GraphExecutor;
pub use routing::{route_after_retrieve, route_after_tool, RetrieveRoute, ToolRoute};
pub use service::{ChatRequest, ChatResponse, ChatService, CONVERSATION_CATEGORY};
