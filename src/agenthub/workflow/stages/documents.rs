// SPDX-License-Identifier: MIT

use super::Stage;
use crate::adk::error::{HubError, WorkflowError};
use crate::agenthub::registry::ToolRegistry;
use crate::agenthub::workflow::state::{keys, Step, WorkflowState};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Pulls relevant chunks from the documents attached to the message
pub struct DocumentProcessor {
    registry: ToolRegistry,
    k: usize,
}

impl DocumentProcessor {
    pub fn new(registry: ToolRegistry, k: usize) -> Self {
        Self { registry, k }
    }
}

#[async_trait]
impl Stage for DocumentProcessor {
    fn step(&self) -> Step {
        Step::ProcessDocuments
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        state.classification().needs_document_processing
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError> {
        let ids: Vec<Value> = state.context.get_array(keys::DOCUMENT_IDS).to_vec();
        if ids.is_empty() {
            return Err(WorkflowError::NoDocuments.into());
        }

        let output = self
            .registry
            .invoke(
                "document_search",
                json!({
                    "query": state.query,
                    "k": self.k,
                    "document_ids": ids
                }),
            )
            .await?;

        let documents = output
            .get("documents")
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        log::info!(
            "Document search returned {} chunks",
            documents.as_array().map_or(0, Vec::len)
        );
        state.context.update(keys::RELEVANT_CONTENT, documents);
        state.task_status.document_processed = true;
        Ok(())
    }
}
