// SPDX-License-Identifier: MIT

use super::Stage;
use crate::adk::error::HubError;
use crate::agenthub::registry::ToolRegistry;
use crate::agenthub::workflow::state::{keys, Step, WorkflowState};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct WebSearcher {
    registry: ToolRegistry,
}

impl WebSearcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for WebSearcher {
    fn step(&self) -> Step {
        Step::WebSearch
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        state.classification().needs_web_search
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError> {
        let output = self
            .registry
            .invoke("web_search", json!({ "query": state.query }))
            .await?;

        let results = output.get("results").cloned().unwrap_or(Value::Array(vec![]));
        state.context.update(keys::WEB_SEARCH_RESULTS, results);
        state.task_status.web_search_completed = true;
        Ok(())
    }
}
