// SPDX-License-Identifier: MIT

use crate::adk::error::HubError;
use crate::adk::tool::Tool;
use crate::agenthub::store::documents::SearchScope;
use crate::agenthub::store::DocumentStore;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

static DOCUMENT_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Text to look for in uploaded documents"
            },
            "k": {
                "type": "integer",
                "description": "Maximum number of chunks to return"
            },
            "document_ids": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Restrict the search to these documents"
            },
            "filter_criteria": {
                "type": "object",
                "description": "Metadata values a document must have to be searched"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Deserialize)]
pub struct DocumentSearchArgs {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub document_ids: Option<Vec<String>>,
    #[serde(default)]
    pub filter_criteria: Option<Map<String, Value>>,
}

pub struct DocumentSearchTool {
    store: Arc<DocumentStore>,
    default_k: usize,
}

impl DocumentSearchTool {
    pub fn new(store: Arc<DocumentStore>, default_k: usize) -> Self {
        Self { store, default_k }
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        "document_search"
    }

    fn description(&self) -> &str {
        "Finds the chunks of uploaded documents that best match a query."
    }

    fn schema(&self) -> &Value {
        &DOCUMENT_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, HubError> {
        let args: DocumentSearchArgs = serde_json::from_value(input)?;
        let k = args.k.filter(|k| *k > 0).unwrap_or(self.default_k);

        let scope = SearchScope {
            document_ids: args.document_ids,
            metadata: args.filter_criteria.unwrap_or_default(),
        };
        let hits = self.store.search(&args.query, k, &scope).await;

        Ok(json!({ "documents": hits }))
    }
}
