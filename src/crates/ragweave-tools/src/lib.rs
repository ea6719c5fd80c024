//! Schema-validated tool registry and secure executor for ragweave
//!
//! Tools are the pipeline's way of taking actions beyond retrieval: a
//! [`ToolDefinition`] carries a typed parameter list, example invocations
//! (rendered into the catalog the reasoning step reads) and an async
//! handler. The [`ToolRegistry`] catalogs definitions, and the
//! [`SecureToolExecutor`] invokes them against untrusted input with
//! validation and a hard timeout, folding every failure into a failed
//! [`ToolResult`](ragweave_core::ToolResult) so a misbehaving tool can
//! never abort a conversation run.

pub mod definition;
pub mod error;
pub mod executor;
pub mod registry;
pub mod validation;

pub use definition::{
    ParameterKind, ToolDefinition, ToolDefinitionBuilder, ToolExample, ToolHandler, ToolParameter,
    ValidatorFn,
};
pub use error::{Result, ToolError};
pub use executor::{SecureToolExecutor, DEFAULT_TOOL_TIMEOUT};
pub use registry::ToolRegistry;
pub use validation::validate_input;
