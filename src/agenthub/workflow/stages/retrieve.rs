// SPDX-License-Identifier: MIT

use super::Stage;
use crate::adk::error::HubError;
use crate::agenthub::store::ContentStore;
use crate::agenthub::workflow::state::{keys, Step, WorkflowState};
use crate::agenthub::workflow::types::{GenerationType, QueryAction};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Loads the artifact an update request refers to
pub struct ContentRetriever {
    store: Arc<ContentStore>,
}

impl ContentRetriever {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    fn downgrade_to_new(state: &mut WorkflowState) {
        state.classification_mut().action = QueryAction::New;
        state
            .context
            .update(keys::PREVIOUS_CONTENT, Value::String(String::new()));
    }
}

#[async_trait]
impl Stage for ContentRetriever {
    fn step(&self) -> Step {
        Step::RetrieveContent
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        state.classification().action == QueryAction::Update
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError> {
        let Some(file_id) = state.classification().file_identifier.clone() else {
            Self::downgrade_to_new(state);
            return Ok(());
        };

        let found = self
            .store
            .resolve(&file_id)
            .await
            .filter(|(_, found)| !found.content.trim().is_empty());

        let Some((resolved_id, found)) = found else {
            log::info!("No stored content for '{}', generating new", file_id);
            Self::downgrade_to_new(state);
            return Ok(());
        };

        log::info!(
            "Retrieved {} characters of previous content for '{}' as '{}'",
            found.content.len(),
            file_id,
            resolved_id
        );

        let stored_type = found
            .metadata
            .generator_type
            .filter(|g| *g != GenerationType::None);
        let classification = state.classification_mut();
        classification.file_identifier = Some(resolved_id);
        if let Some(generation) = stored_type {
            classification.generation_type = generation;
        }
        if let Some(format) = found.metadata.format {
            if format.generation_type() == classification.generation_type {
                classification.target_format = Some(format);
            }
        }
        *classification = classification.clone().normalized();

        state
            .context
            .update(keys::PREVIOUS_CONTENT, Value::String(found.content));
        state.context.update(
            keys::PREVIOUS_CONTENT_METADATA,
            serde_json::to_value(&found.metadata)?,
        );
        Ok(())
    }
}
