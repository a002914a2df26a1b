// SPDX-License-Identifier: MIT

//! Pipeline stages
//!
//! Each stage decides from the classification whether it runs and then
//! mutates the shared [`WorkflowState`]. Stages other than the response
//! generator are non-fatal: the workflow records their errors and moves on.

mod documents;
mod generate;
mod respond;
mod retrieve;
mod search;

pub use documents::DocumentProcessor;
pub use generate::{CodeGenerator, DocumentGenerator};
pub use respond::ResponseGenerator;
pub use retrieve::ContentRetriever;
pub use search::WebSearcher;

use super::state::{Step, WorkflowState};
use crate::adk::error::HubError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Stage: Send + Sync {
    fn step(&self) -> Step;

    fn should_run(&self, state: &WorkflowState) -> bool;

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError>;
}

/// Render a context value for a prompt: strings verbatim, the rest as JSON
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}
