// SPDX-License-Identifier: MIT

//! Code and document generation

use super::{render_value, Stage};
use crate::adk::error::{HubError, WorkflowError};
use crate::adk::model::Content;
use crate::agenthub::store::content::ArtifactMetadata;
use crate::agenthub::store::ContentStore;
use crate::agenthub::workflow::models::ModelRole;
use crate::agenthub::workflow::state::{keys, Step, WorkflowState};
use crate::agenthub::workflow::types::{GenerationType, QueryAction, TargetFormat};
use crate::agenthub::workflow::validate::{
    extract_code, is_valid_markdown, slug_from_query, strip_leading_chatter, typescript_issues,
    unwrap_document,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

fn code_guidelines(format: TargetFormat) -> &'static str {
    match format {
        TargetFormat::Py => {
            "Generate Python code following these guidelines:\n\
             1. Use type hints for parameters and return values\n\
             2. Follow PEP 8 style guidelines\n\
             3. Include docstrings for functions and classes\n\
             4. Handle errors with try/except\n\
             5. Use list/dict comprehensions where appropriate\n"
        }
        TargetFormat::Ts => {
            "Generate TypeScript code following these guidelines:\n\
             1. Use strict type checking\n\
             2. Follow Airbnb TypeScript style guide\n\
             3. Include JSDoc comments\n\
             4. Use async/await for asynchronous code\n\
             5. Include error handling\n"
        }
        TargetFormat::Js => {
            "Generate JavaScript code following these guidelines:\n\
             1. Use modern ES6+ syntax\n\
             2. Follow Airbnb JavaScript style guide\n\
             3. Include JSDoc comments\n\
             4. Use async/await for asynchronous code\n\
             5. Include error handling\n"
        }
        TargetFormat::Cpp => {
            "Generate C++ code following these guidelines:\n\
             1. Use modern C++17/20 features\n\
             2. Follow Google C++ style guide\n\
             3. Include doxygen comments\n\
             4. Use RAII principles\n\
             5. Use smart pointers over raw pointers\n"
        }
        TargetFormat::Java => {
            "Generate Java code following these guidelines:\n\
             1. Use latest Java features\n\
             2. Follow Google Java style guide\n\
             3. Include Javadoc comments\n\
             4. Use try-with-resources for AutoCloseable\n\
             5. Follow SOLID principles\n"
        }
        _ => "Generate well-structured code.\n",
    }
}

fn document_guidelines(format: TargetFormat) -> &'static str {
    match format {
        TargetFormat::Txt => {
            "Generate plain text content following these guidelines:\n\
             1. Use clear headings and sections\n\
             2. Include proper paragraph breaks\n\
             3. Use consistent indentation for lists\n\
             4. Keep line lengths reasonable\n\
             5. Use ASCII characters only\n"
        }
        TargetFormat::Md => {
            "Generate Markdown content following these guidelines:\n\
             1. Use proper Markdown syntax for headings\n\
             2. Include links and images with proper syntax\n\
             3. Use code blocks for code snippets\n\
             4. Include lists and tables with proper formatting\n\
             5. Use blockquotes for citations\n"
        }
        TargetFormat::Doc => {
            "Generate Word-compatible content following these guidelines:\n\
             1. Use proper heading levels (H1, H2, etc.)\n\
             2. Include a table of contents structure\n\
             3. Use consistent font styles\n\
             4. Include page break hints where appropriate\n\
             5. Structure content for easy formatting\n"
        }
        TargetFormat::Pdf => {
            "Generate PDF-suitable content following these guidelines:\n\
             1. Include a clear document structure\n\
             2. Use formal section numbering\n\
             3. Include proper citations if needed\n\
             4. Format tables and figures appropriately\n\
             5. Include metadata hints (title, author, etc.)\n"
        }
        _ => "Generate well-structured content.\n",
    }
}

const TYPESCRIPT_REFINE: &str = "Improve this TypeScript code following best practices:\n\
     1. Use strict type checking\n\
     2. Follow Airbnb TypeScript style guide\n\
     3. Include JSDoc comments\n\
     4. Use async/await for asynchronous code\n\
     5. Include error handling with try/catch\n\
     Return only the improved code in a single fenced block.";

const MARKDOWN_REFINE: &str = "Improve this Markdown following best practices:\n\
     1. Use proper Markdown syntax for headings\n\
     2. Include links and images with proper syntax\n\
     3. Use code blocks for code snippets\n\
     4. Include lists and tables with proper formatting\n\
     5. Use blockquotes for citations\n\
     Return only the improved document.";

/// Request messages shared by both generators
fn build_messages(system: String, state: &WorkflowState, format: TargetFormat) -> Vec<Content> {
    let mut request = String::new();

    let references: Vec<String> = [
        ("Web search results", keys::WEB_SEARCH_RESULTS),
        ("Relevant document excerpts", keys::RELEVANT_CONTENT),
    ]
    .iter()
    .filter_map(|(label, key)| {
        let items = state.context.get_array(key);
        (!items.is_empty()).then(|| format!("{}:\n{}", label, render_value(&Value::Array(items.to_vec()))))
    })
    .collect();
    if !references.is_empty() {
        request.push_str("Reference material:\n");
        request.push_str(&references.join("\n\n"));
        request.push_str("\n\n");
    }

    match state.context.get_str(keys::PREVIOUS_CONTENT) {
        Some(previous) => {
            request.push_str(&format!(
                "Current version:\n```{}\n{}\n```\n\n\
                 Apply the requested changes and return the complete updated {}, not a diff.\n\n\
                 Request: {}",
                format.file_extension(),
                previous,
                format.label(),
                state.query
            ));
        }
        None => request.push_str(&format!("Task: {}", state.query)),
    }

    vec![Content::system(system), Content::user(request)]
}

/// Save the artifact and expose it to the response stage
async fn persist(
    store: &ContentStore,
    state: &mut WorkflowState,
    content: String,
    generation: GenerationType,
    format: TargetFormat,
) -> Result<(), HubError> {
    let file_id = state
        .classification()
        .file_identifier
        .clone()
        .unwrap_or_else(|| slug_from_query(&state.query));
    let is_update = state.classification().action == QueryAction::Update;

    store
        .save(
            &file_id,
            &content,
            ArtifactMetadata::new(generation, Some(format)),
            Some(&state.query),
            is_update,
        )
        .await?;

    let classification = state.classification_mut();
    classification.file_identifier = Some(file_id);
    classification.target_format = Some(format);
    state
        .context
        .update(keys::GENERATED_CONTENT, Value::String(content));
    Ok(())
}

fn empty_output(step: Step) -> HubError {
    WorkflowError::InvalidState {
        stage: step.to_string(),
        reason: "model returned no usable content".to_string(),
    }
    .into()
}

pub struct CodeGenerator {
    role: ModelRole,
    store: Arc<ContentStore>,
}

impl CodeGenerator {
    pub fn new(role: ModelRole, store: Arc<ContentStore>) -> Self {
        Self { role, store }
    }

    async fn refine_typescript(&self, code: String) -> String {
        let issues = typescript_issues(&code);
        if issues.is_empty() {
            return code;
        }
        log::warn!(
            "Generated TypeScript doesn't follow best practices: {}",
            issues.join("; ")
        );
        let messages = vec![
            Content::system(TYPESCRIPT_REFINE),
            Content::user(format!(
                "Improve this TypeScript code following best practices:\n{}",
                code
            )),
        ];
        match self.role.complete(&messages).await {
            Ok(reply) => {
                let refined = extract_code(&reply);
                if refined.trim().is_empty() {
                    code
                } else {
                    refined
                }
            }
            Err(e) => {
                log::warn!("TypeScript refinement failed, keeping first draft: {}", e);
                code
            }
        }
    }
}

#[async_trait]
impl Stage for CodeGenerator {
    fn step(&self) -> Step {
        Step::GenerateCode
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        state.classification().generation_type == GenerationType::Code
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError> {
        let format = state
            .classification()
            .target_format
            .filter(|f| f.generation_type() == GenerationType::Code)
            .unwrap_or(TargetFormat::Py);

        let system = format!(
            "{}\nReturn only the {} code in a single fenced block.",
            code_guidelines(format),
            format.label()
        );
        let reply = self
            .role
            .complete(&build_messages(system, state, format))
            .await?;
        let mut code = extract_code(&reply);
        if code.trim().is_empty() {
            return Err(empty_output(self.step()));
        }

        if format == TargetFormat::Ts {
            code = self.refine_typescript(code).await;
        }

        log::info!("Code generation completed for {}", format);
        persist(&self.store, state, code, GenerationType::Code, format).await?;
        state.task_status.code_generated = true;
        Ok(())
    }
}

pub struct DocumentGenerator {
    role: ModelRole,
    store: Arc<ContentStore>,
}

impl DocumentGenerator {
    pub fn new(role: ModelRole, store: Arc<ContentStore>) -> Self {
        Self { role, store }
    }

    fn clean(reply: &str) -> String {
        strip_leading_chatter(&unwrap_document(reply))
    }

    async fn refine_markdown(&self, document: String) -> String {
        if is_valid_markdown(&document) {
            return document;
        }
        log::warn!("Generated Markdown doesn't follow best practices");
        let messages = vec![
            Content::system(MARKDOWN_REFINE),
            Content::user(format!(
                "Improve this Markdown following best practices:\n{}",
                document
            )),
        ];
        match self.role.complete(&messages).await {
            Ok(reply) => {
                let refined = Self::clean(&reply);
                if refined.trim().is_empty() {
                    document
                } else {
                    refined
                }
            }
            Err(e) => {
                log::warn!("Markdown refinement failed, keeping first draft: {}", e);
                document
            }
        }
    }
}

#[async_trait]
impl Stage for DocumentGenerator {
    fn step(&self) -> Step {
        Step::GenerateDocument
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        state.classification().generation_type == GenerationType::Document
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<(), HubError> {
        let format = state
            .classification()
            .target_format
            .filter(|f| f.generation_type() == GenerationType::Document)
            .unwrap_or(TargetFormat::Md);

        let system = format!(
            "{}\nReturn only the document content.",
            document_guidelines(format)
        );
        let reply = self
            .role
            .complete(&build_messages(system, state, format))
            .await?;
        let mut document = Self::clean(&reply);
        if document.trim().is_empty() {
            return Err(empty_output(self.step()));
        }

        if format == TargetFormat::Md {
            document = self.refine_markdown(document).await;
        }

        log::info!("Document generation completed for {}", format);
        persist(&self.store, state, document, GenerationType::Document, format).await?;
        state.task_status.document_generated = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenthub::workflow::types::Classification;
    use serde_json::json;

    #[test]
    fn test_every_format_has_guidelines() {
        for format in TargetFormat::ALL {
            let text = match format.generation_type() {
                GenerationType::Code => code_guidelines(format),
                _ => document_guidelines(format),
            };
            assert!(text.contains("1."), "{format}");
        }
    }

    #[test]
    fn test_update_request_includes_previous_content() {
        let mut state = WorkflowState::new("add a docstring", vec![]);
        state.task_status.classification =
            Classification::generate(GenerationType::Code, Some(TargetFormat::Py));
        state
            .context
            .update(keys::PREVIOUS_CONTENT, json!("def f():\n    pass"));

        let messages = build_messages("sys".into(), &state, TargetFormat::Py);
        let request = messages[1].text();
        assert!(request.contains("```py\ndef f():\n    pass\n```"));
        assert!(request.contains("complete updated Python"));
        assert!(request.ends_with("Request: add a docstring"));
    }

    #[test]
    fn test_new_request_includes_references() {
        let mut state = WorkflowState::new("summarize", vec![]);
        state
            .context
            .update(keys::RELEVANT_CONTENT, json!([{"content": "chunk one"}]));

        let request = build_messages("sys".into(), &state, TargetFormat::Md)[1].text();
        assert!(request.starts_with("Reference material:\nRelevant document excerpts:"));
        assert!(request.contains("chunk one"));
        assert!(request.ends_with("Task: summarize"));
    }
}
