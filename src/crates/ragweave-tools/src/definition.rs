//! Tool definitions: typed parameters, examples and handlers
//!
//! A [`ToolDefinition`] is the unit the registry catalogs: a name, a typed
//! parameter list, an async handler, and example invocations. The examples
//! are not decoration: they are rendered into the natural-language catalog
//! the reasoning step reads when deciding whether a tool should run.
//!
//! # Example
//!
//! ```rust
//! use ragweave_tools::{ToolDefinition, ToolHandler, ToolParameter, Result};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct Calculator;
//!
//! #[async_trait]
//! impl ToolHandler for Calculator {
//!     async fn run(&self, input: Value) -> Result<Value> {
//!         let a = input["a"].as_f64().unwrap_or(0.0);
//!         let b = input["b"].as_f64().unwrap_or(0.0);
//!         Ok(json!({"result": a + b}))
//!     }
//! }
//!
//! let tool = ToolDefinition::builder("add", "Add two numbers")
//!     .category("calculation")
//!     .parameter(ToolParameter::number("a", true))
//!     .parameter(ToolParameter::number("b", true))
//!     .example("add three and four", json!({"a": 3, "b": 4}))
//!     .handler(Calculator)
//!     .build();
//!
//! assert_eq!(tool.name, "add");
//! ```

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Runtime type a tool parameter must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterKind {
    /// Whether `value`'s runtime type matches this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,

    /// Filled in for absent optional parameters during validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ParameterKind::String, required)
    }

    pub fn number(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ParameterKind::Number, required)
    }

    pub fn boolean(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ParameterKind::Boolean, required)
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Example invocation shown to the reasoning step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExample {
    /// Natural-language description of when this invocation applies
    pub description: String,
    pub input: Value,
}

/// The executable behind a tool definition
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn run(&self, input: Value) -> Result<Value>;
}

/// Custom validation function that fully replaces default validation
pub type ValidatorFn = dyn Fn(&Value) -> Result<()> + Send + Sync;

/// A named, schema-validated callable capability
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    /// Grouping key for [`ToolRegistry::list_by_category`](crate::ToolRegistry::list_by_category)
    pub category: String,

    pub parameters: Vec<ToolParameter>,
    pub examples: Vec<ToolExample>,

    pub handler: Arc<dyn ToolHandler>,

    /// When present, default validation is skipped entirely
    pub validator: Option<Arc<ValidatorFn>>,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("parameters", &self.parameters)
            .field("examples", &self.examples.len())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl ToolDefinition {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolDefinitionBuilder {
        ToolDefinitionBuilder::new(name, description)
    }

    /// Render this tool's entry for the natural-language catalog
    pub fn catalog_entry(&self) -> String {
        let mut entry = format!("- {}: {}", self.name, self.description);
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|p| {
                    format!(
                        "{} ({}{})",
                        p.name,
                        p.kind,
                        if p.required { ", required" } else { "" }
                    )
                })
                .collect();
            entry.push_str(&format!("\n  parameters: {}", params.join(", ")));
        }
        for example in &self.examples {
            entry.push_str(&format!(
                "\n  example: {} -> {}",
                example.description, example.input
            ));
        }
        entry
    }
}

/// Builder for [`ToolDefinition`]
pub struct ToolDefinitionBuilder {
    name: String,
    description: String,
    category: String,
    parameters: Vec<ToolParameter>,
    examples: Vec<ToolExample>,
    handler: Option<Arc<dyn ToolHandler>>,
    validator: Option<Arc<ValidatorFn>>,
}

impl ToolDefinitionBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: "general".to_string(),
            parameters: Vec::new(),
            examples: Vec::new(),
            handler: None,
            validator: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn example(mut self, description: impl Into<String>, input: Value) -> Self {
        self.examples.push(ToolExample {
            description: description.into(),
            input,
        });
        self
    }

    pub fn handler(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Finalize the definition
    ///
    /// # Panics
    ///
    /// Panics if no handler was supplied; a tool without an executable is a
    /// programming error, not a runtime condition.
    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description,
            category: self.category,
            parameters: self.parameters,
            examples: self.examples,
            handler: self.handler.expect("tool definition requires a handler"),
            validator: self.validator,
        }
    }
}
