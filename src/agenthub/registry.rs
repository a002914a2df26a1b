// SPDX-License-Identifier: MIT

use crate::adk::error::HubError;
use crate::adk::tool::{missing_required_args, Tool};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        log::info!("Registered tool: {} ({})", tool.name(), tool.description());
        let mut tools = self.tools.write().await;
        tools.insert(tool.name().to_string(), tool);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Sorted names of every registered tool
    pub async fn names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up a tool, check its required arguments and run it
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, HubError> {
        let tool = self
            .get(name)
            .await
            .ok_or_else(|| HubError::tool_not_found(name))?;

        let missing = missing_required_args(tool.schema(), &input);
        if !missing.is_empty() {
            return Err(HubError::validation(format!(
                "Tool '{}' missing required arguments: {}",
                name,
                missing.join(", ")
            )));
        }

        log::debug!("Invoking tool {} with {}", name, input);
        tool.execute(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
