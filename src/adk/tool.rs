// SPDX-License-Identifier: MIT

use crate::adk::error::HubError;
use async_trait::async_trait;
use serde_json::Value;

/// A capability the workflow can invoke with JSON arguments.
///
/// `name()`, `description()` and `schema()` return borrowed values;
/// implementations keep them in struct fields or statics.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (unique within a registry)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, HubError>;
}

/// Names listed under the schema's `required` key that `input` lacks
pub fn missing_required_args(schema: &Value, input: &Value) -> Vec<String> {
    schema["required"]
        .as_array()
        .map(|required| {
            required
                .iter()
                .filter_map(Value::as_str)
                .filter(|key| input.get(*key).map_or(true, Value::is_null))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
