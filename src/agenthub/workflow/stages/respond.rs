// SPDX-License-Identifier: MIT

use super::render_value;
use crate::adk::error::{HubError, WorkflowError};
use crate::adk::model::Content;
use crate::agenthub::workflow::models::ModelRole;
use crate::agenthub::workflow::state::{keys, Step, WorkflowState};
use crate::agenthub::workflow::types::GenerationType;

const CODE_PROMPT: &str = "You are a programming assistant providing context for generated code.\n\
     For the code you're describing:\n\
     1. Explain the key components and their purpose\n\
     2. Highlight any important design patterns or techniques used\n\
     3. Note any assumptions or requirements\n\
     4. Suggest potential improvements or alternatives\n\
     5. Include any relevant usage examples\n\
     The code itself is shown to the user separately; do not repeat it in full.";

const DOCUMENT_PROMPT: &str = "You are a documentation assistant providing context for generated content.\n\
     For the document you're describing:\n\
     1. Summarize the main sections and their purpose\n\
     2. Explain the document structure and organization\n\
     3. Highlight key information or takeaways\n\
     4. Note any formatting or style conventions used\n\
     5. Suggest how to best use or navigate the document\n\
     The document itself is shown to the user separately; do not repeat it in full.";

const ANSWER_PROMPT: &str = "You are a helpful assistant providing information based on:\n\
     1. Direct knowledge when available\n\
     2. Web search results if performed\n\
     3. Processed documents if analyzed\n\
     Synthesize the information into a clear, concise response.";

/// Context keys rendered into the final prompt, in order
const SECTIONS: [(&str, &str); 5] = [
    ("Generated content", keys::GENERATED_CONTENT),
    ("Previous version", keys::PREVIOUS_CONTENT),
    ("Web search results", keys::WEB_SEARCH_RESULTS),
    ("Relevant document excerpts", keys::RELEVANT_CONTENT),
    ("Processing issues", keys::ERROR),
];

/// Final stage: turns the collected context into the chat reply
pub struct ResponseGenerator {
    role: ModelRole,
}

impl ResponseGenerator {
    pub fn new(role: ModelRole) -> Self {
        Self { role }
    }

    pub fn step(&self) -> Step {
        Step::Respond
    }

    /// Labelled sections for every non-empty context value
    pub fn render_context(state: &WorkflowState) -> String {
        let sections: Vec<String> = SECTIONS
            .iter()
            .filter_map(|(label, key)| {
                let value = state.context.get(key)?;
                let empty = match value {
                    serde_json::Value::String(s) => s.trim().is_empty(),
                    serde_json::Value::Array(a) => a.is_empty(),
                    serde_json::Value::Null => true,
                    _ => false,
                };
                (!empty).then(|| format!("## {}\n{}", label, render_value(value)))
            })
            .collect();
        if sections.is_empty() {
            "(none)".to_string()
        } else {
            sections.join("\n\n")
        }
    }

    pub fn build_messages(state: &WorkflowState) -> Vec<Content> {
        let status = &state.task_status;
        let (system, request) = match state.classification().generation_type {
            GenerationType::Code if status.code_generated => {
                (CODE_PROMPT, "Describe the generated solution.")
            }
            GenerationType::Document if status.document_generated => {
                (DOCUMENT_PROMPT, "Describe the generated content.")
            }
            _ => (ANSWER_PROMPT, "Provide a comprehensive answer."),
        };

        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Content::system(system));
        messages.extend(state.history().iter().cloned());
        messages.push(Content::user(format!(
            "Query: {}\nContext:\n{}\n\n{}",
            state.query,
            Self::render_context(state),
            request
        )));
        messages
    }

    /// Generate the reply and append it to the transcript
    pub async fn respond(&self, state: &mut WorkflowState) -> Result<String, HubError> {
        let messages = Self::build_messages(state);
        let reply = self
            .role
            .complete(&messages)
            .await
            .map_err(|e| WorkflowError::ResponseGeneration(e.to_string()))?;
        state.messages.push(Content::model(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenthub::workflow::types::{Classification, TargetFormat};
    use serde_json::json;

    #[test]
    fn test_render_context_skips_empty_values() {
        let mut state = WorkflowState::new("q", vec![]);
        assert_eq!(ResponseGenerator::render_context(&state), "(none)");

        state.context.update(keys::PREVIOUS_CONTENT, json!(""));
        state
            .context
            .update(keys::WEB_SEARCH_RESULTS, json!([{"title": "Rust 2024"}]));
        let rendered = ResponseGenerator::render_context(&state);
        assert!(rendered.starts_with("## Web search results\n"));
        assert!(rendered.contains("Rust 2024"));
        assert!(!rendered.contains("Previous version"));
    }

    #[test]
    fn test_prompt_choice_follows_completion() {
        let mut state = WorkflowState::new("write a sorter", vec![Content::user("hi"), Content::model("hello")]);
        state.task_status.classification =
            Classification::generate(GenerationType::Code, Some(TargetFormat::Py));

        let messages = ResponseGenerator::build_messages(&state);
        assert!(messages[0].text().starts_with("You are a helpful assistant"));

        state.task_status.code_generated = true;
        let messages = ResponseGenerator::build_messages(&state);
        assert!(messages[0].text().starts_with("You are a programming assistant"));
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].text(), "hi");
        assert!(messages[3].text().starts_with("Query: write a sorter"));
        assert!(messages[3].text().ends_with("Describe the generated solution."));
    }
}
