// SPDX-License-Identifier: MIT

//! Query classification
//!
//! One LLM call tags the message with routing flags. Any failure
//! (provider error, malformed JSON, missing fields) degrades to a simple
//! classification so the request is still answered.

use super::models::ModelRole;
use super::types::{
    Classification, GenerationType, QueryAction, QueryType, TargetFormat,
};
use crate::adk::error::{HubError, ModelError};
use crate::adk::model::Content;
use once_cell::sync::Lazy;
use serde_json::Value;

static CLASSIFICATION_SCHEMA: Lazy<String> = Lazy::new(|| {
    let schema = schemars::schema_for!(Classification);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
});

static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    format!(
        "You are a query classification agent.\n\
         Decide whether the user's message can be answered directly or needs \
         an artifact (code or a document) to be generated.\n\
         1. query_type: \"simple\" when no code or document is requested, \"complex\" otherwise.\n\
         2. needs_web_search: true when the answer needs recent information past your training cutoff.\n\
         3. needs_document_processing: true when the answer depends on attached documents.\n\
         4. generation_type: \"code\", \"document\" or \"none\".\n\
         5. target_format: one of py, ts, js, cpp, java for code; txt, md, doc, pdf for documents; null otherwise.\n\
         6. action: \"update\" when the user asks to change an artifact generated earlier, \"new\" otherwise.\n\
         7. file_identifier: the name of the artifact to update, or a short snake_case name for a new one.\n\
         Reply with a single JSON object matching this schema and nothing else:\n{}",
        *CLASSIFICATION_SCHEMA
    )
});

/// What the classifier sees besides the message itself
#[derive(Debug, Clone, Default)]
pub struct ClassifierInput<'a> {
    pub message: &'a str,
    pub has_attachments: bool,
    /// Identifiers of artifacts already in the content store
    pub known_files: &'a [String],
}

pub struct QueryClassifier {
    role: ModelRole,
}

impl QueryClassifier {
    pub fn new(role: ModelRole) -> Self {
        Self { role: role.json() }
    }

    pub fn build_messages(input: &ClassifierInput<'_>) -> Vec<Content> {
        let mut context = format!(
            "Documents attached to this message: {}",
            if input.has_attachments { "yes" } else { "no" }
        );
        if !input.known_files.is_empty() {
            context.push_str("\nExisting artifacts: ");
            context.push_str(&input.known_files.join(", "));
        }
        vec![
            Content::system(SYSTEM_PROMPT.as_str()),
            Content::user(format!("{}\n\nMessage:\n{}", context, input.message)),
        ]
    }

    /// Classify a message; never fails
    pub async fn classify(&self, input: &ClassifierInput<'_>) -> Classification {
        let messages = Self::build_messages(input);
        let reply = match self.role.complete(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Classifier call failed, treating query as simple: {}", e);
                return Classification::simple();
            }
        };
        log::debug!("Raw classifier reply: {}", reply);

        match parse_classification(&reply) {
            Ok(classification) => {
                log::info!("Query classified as {:?}", classification);
                classification
            }
            Err(e) => {
                log::warn!("Unparseable classifier reply, treating query as simple: {}", e);
                Classification::simple()
            }
        }
    }
}

/// Span from the first `{` to the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn field<'a>(obj: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n)).filter(|v| !v.is_null())
}

fn flag(obj: &Value, name: &str) -> bool {
    match obj.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_i64().map_or(false, |n| n != 0),
        _ => false,
    }
}

fn text_field<'a>(obj: &'a Value, names: &[&str]) -> Option<String> {
    field(obj, names)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
}

/// Parse and normalize a classifier reply.
///
/// Accepts the JSON wrapped in prose or a markdown fence. Unknown enum
/// values count as absent.
pub fn parse_classification(reply: &str) -> Result<Classification, HubError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| ModelError::InvalidResponse("no JSON object in reply".into()))?;
    let obj: Value = serde_json::from_str(json)?;
    if !obj.is_object() {
        return Err(ModelError::InvalidResponse("reply is not a JSON object".into()).into());
    }

    let query_type = match text_field(&obj, &["query_type", "type"]).as_deref() {
        Some("complex") => QueryType::Complex,
        Some("simple") => QueryType::Simple,
        _ => {
            return Err(
                ModelError::InvalidResponse("missing or unknown query_type".into()).into(),
            )
        }
    };

    let generation_type = match text_field(&obj, &["generation_type", "generator_type"]).as_deref()
    {
        Some("code") => GenerationType::Code,
        Some("document") => GenerationType::Document,
        _ => GenerationType::None,
    };

    let target_format = text_field(
        &obj,
        &["target_format", "code_language", "document_format", "format"],
    )
    .and_then(|f| TargetFormat::from_name(&f));

    let action = match text_field(&obj, &["action"]).as_deref() {
        Some("update") => QueryAction::Update,
        _ => QueryAction::New,
    };

    let file_identifier = field(&obj, &["file_identifier"])
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Classification {
        query_type,
        needs_web_search: flag(&obj, "needs_web_search"),
        needs_document_processing: flag(&obj, "needs_document_processing"),
        generation_type,
        target_format,
        action,
        file_identifier,
    }
    .normalized())
}
