// SPDX-License-Identifier: MIT

use crate::adk::error::HubError;
use crate::adk::http::{HttpOptions, RetryPolicy};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

static WEB_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Serialize, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResult {
    pub query: String,
    pub results: Vec<Value>,
}

/// Client for the external web-search service.
///
/// Calls `GET {base}/search?query=...`. Without a configured base URL the
/// tool answers with an empty result list.
pub struct WebSearchTool {
    client: Client,
    base_url: Option<Url>,
    retry: RetryPolicy,
}

impl WebSearchTool {
    pub fn new(base_url: Option<Url>, options: &HttpOptions) -> Result<Self, HubError> {
        if base_url.is_none() {
            log::info!("No web search service configured; web_search returns no results");
        }
        Ok(Self {
            client: options.client()?,
            base_url,
            retry: options.retry.clone(),
        })
    }

    fn search_url(base: &Url, query: &str) -> Result<Url, HubError> {
        let mut url = base
            .join("search")
            .map_err(|e| HubError::config(format!("invalid web search url: {}", e)))?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web through the configured search service and returns raw result entries."
    }

    fn schema(&self) -> &Value {
        &WEB_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, HubError> {
        let args: WebSearchArgs = serde_json::from_value(input)?;

        let Some(base) = &self.base_url else {
            return Ok(serde_json::to_value(WebSearchResult {
                query: args.query,
                results: Vec::new(),
            })?);
        };

        let url = Self::search_url(base, &args.query)?;
        let resp = self
            .retry
            .send("web search", || {
                self.client
                    .get(url.clone())
                    .header("Accept", "application/json")
            })
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(HubError::api("websearch", format!("{}: {}", status, text)));
        }

        let body: Value = resp.json().await?;
        let results = match body.get("results") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        };
        log::info!(
            "Web search for '{}' returned {} results",
            args.query,
            results.len()
        );

        Ok(serde_json::to_value(WebSearchResult {
            query: args.query,
            results,
        })?)
    }
}
