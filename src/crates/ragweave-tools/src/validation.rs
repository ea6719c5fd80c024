//! Input validation against a tool's declared parameters
//!
//! Before execution, every declared parameter is checked: a required
//! parameter that is missing is rejected, and a supplied value's runtime
//! type must match the declared kind. Absent optional parameters with a
//! declared default are filled in, so handlers see a normalized input.
//!
//! A custom validator on the definition, when present, fully replaces this
//! default validation, including the default-filling step.

use crate::definition::ToolDefinition;
use crate::error::{Result, ToolError};
use serde_json::Value;

/// Validate `input` against `definition`, returning the normalized input
pub fn validate_input(definition: &ToolDefinition, input: &Value) -> Result<Value> {
    if let Some(validator) = &definition.validator {
        validator(input)?;
        return Ok(input.clone());
    }

    let mut normalized = input
        .as_object()
        .cloned()
        .ok_or_else(|| ToolError::Validation("tool input must be an object".to_string()))?;

    for parameter in &definition.parameters {
        match normalized.get(&parameter.name) {
            Some(value) => {
                if !parameter.kind.matches(value) {
                    return Err(ToolError::Validation(format!(
                        "parameter '{}' has wrong type, expected {}",
                        parameter.name, parameter.kind
                    )));
                }
            }
            None if parameter.required => {
                return Err(ToolError::Validation(format!(
                    "required parameter '{}' is missing",
                    parameter.name
                )));
            }
            None => {
                if let Some(default) = &parameter.default {
                    normalized.insert(parameter.name.clone(), default.clone());
                }
            }
        }
    }

    Ok(Value::Object(normalized))
}
