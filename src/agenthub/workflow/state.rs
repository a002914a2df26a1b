// SPDX-License-Identifier: MIT

//! Mutable per-request workflow state

use super::types::{Classification, StageError, TaskStatus};
use crate::adk::model::Content;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Well-known context keys
pub mod keys {
    pub const WEB_SEARCH_RESULTS: &str = "web_search_results";
    pub const RELEVANT_CONTENT: &str = "relevant_content";
    pub const PREVIOUS_CONTENT: &str = "previous_content";
    pub const PREVIOUS_CONTENT_METADATA: &str = "previous_content_metadata";
    pub const GENERATED_CONTENT: &str = "generated_content";
    pub const DOCUMENT_IDS: &str = "document_ids";
    pub const ERROR: &str = "error";
}

/// How a new value combines with the one already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Overwrite,
    /// Extend an array; arrays are flattened in, scalars pushed
    Append,
    /// Shallow-merge object keys
    Merge,
}

/// Keyed JSON values shared between stages
#[derive(Debug, Clone)]
pub struct ContextBag {
    fields: HashMap<String, Value>,
    reducers: HashMap<String, Reducer>,
}

impl Default for ContextBag {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBag {
    /// Bag with the reducers for every well-known key
    pub fn new() -> Self {
        Self::with_reducers([
            (keys::WEB_SEARCH_RESULTS, Reducer::Append),
            (keys::RELEVANT_CONTENT, Reducer::Append),
            (keys::PREVIOUS_CONTENT, Reducer::Overwrite),
            (keys::PREVIOUS_CONTENT_METADATA, Reducer::Merge),
            (keys::GENERATED_CONTENT, Reducer::Overwrite),
            (keys::DOCUMENT_IDS, Reducer::Append),
            (keys::ERROR, Reducer::Overwrite),
        ])
    }

    pub fn with_reducers<'a>(reducers: impl IntoIterator<Item = (&'a str, Reducer)>) -> Self {
        Self {
            fields: HashMap::new(),
            reducers: reducers
                .into_iter()
                .map(|(k, r)| (k.to_string(), r))
                .collect(),
        }
    }

    /// Update a field using its reducer; unknown keys overwrite
    pub fn update(&mut self, key: &str, value: Value) {
        let reducer = self.reducers.get(key).copied().unwrap_or_default();

        match reducer {
            Reducer::Overwrite => {
                self.fields.insert(key.to_string(), value);
            }
            Reducer::Append => {
                let slot = self
                    .fields
                    .entry(key.to_string())
                    .or_insert(Value::Array(vec![]));
                if !slot.is_array() {
                    let previous = slot.take();
                    *slot = Value::Array(vec![previous]);
                }
                if let Value::Array(items) = slot {
                    match value {
                        Value::Array(new_items) => items.extend(new_items),
                        other => items.push(other),
                    }
                }
            }
            Reducer::Merge => {
                let slot = self
                    .fields
                    .entry(key.to_string())
                    .or_insert(Value::Object(Map::new()));
                match (slot, value) {
                    (Value::Object(current), Value::Object(new_obj)) => {
                        for (k, v) in new_obj {
                            current.insert(k, v);
                        }
                    }
                    (slot, other) => *slot = other,
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Non-empty string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Array value, empty when absent
    pub fn get_array(&self, key: &str) -> &[Value] {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Stage currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Start,
    Classify,
    RetrieveContent,
    WebSearch,
    ProcessDocuments,
    GenerateCode,
    GenerateDocument,
    Respond,
    End,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Classify => "classify",
            Self::RetrieveContent => "retrieve_content",
            Self::WebSearch => "web_search",
            Self::ProcessDocuments => "process_documents",
            Self::GenerateCode => "generate_code",
            Self::GenerateDocument => "generate_document",
            Self::Respond => "respond",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// The incoming user message, trimmed
    pub query: String,
    /// Transcript: prior chat turns, the user message, then the reply
    pub messages: Vec<Content>,
    pub current_step: Step,
    pub task_status: TaskStatus,
    pub context: ContextBag,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>, history: Vec<Content>) -> Self {
        let query = query.into();
        let mut messages = history;
        messages.push(Content::user(query.clone()));
        Self {
            query,
            messages,
            current_step: Step::Start,
            task_status: TaskStatus::default(),
            context: ContextBag::new(),
        }
    }

    pub fn classification(&self) -> &Classification {
        &self.task_status.classification
    }

    pub fn classification_mut(&mut self) -> &mut Classification {
        &mut self.task_status.classification
    }

    /// Turns before the current user message
    pub fn history(&self) -> &[Content] {
        let end = self.messages.len().saturating_sub(1);
        &self.messages[..end]
    }

    /// Record a non-fatal stage failure
    pub fn record_error(&mut self, step: Step, message: impl Into<String>) {
        let message = message.into();
        log::warn!("Stage {} failed: {}", step, message);
        self.context
            .update(keys::ERROR, Value::String(format!("{}: {}", step, message)));
        self.task_status.errors.push(StageError {
            stage: step.to_string(),
            message,
        });
    }
}
