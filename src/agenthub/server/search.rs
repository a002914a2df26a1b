// SPDX-License-Identifier: MIT

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{ok, ApiResponse};
use super::AppState;
use crate::adk::error::HubError;

#[derive(Debug, Deserialize)]
pub struct WebSearchParams {
    pub query: String,
}

/// Proxy to the configured web-search service through the tool registry
pub async fn web_search(
    State(state): State<AppState>,
    params: Result<Query<WebSearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Value>>, HubError> {
    let Query(params) = params?;
    let query = params.query.trim();
    if query.is_empty() {
        return Err(HubError::validation("query cannot be empty"));
    }
    let results = state
        .registry
        .invoke("web_search", json!({ "query": query }))
        .await?;
    Ok(ok(results))
}
