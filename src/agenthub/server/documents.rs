// SPDX-License-Identifier: MIT

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::envelope::{ok, ApiResponse};
use super::validation::validate_upload;
use super::{multipart_error, AppState};
use crate::adk::error::HubError;
use crate::agenthub::store::documents::{DocumentHit, DocumentInfo, DocumentSummary, SearchScope};

/// Store one file (`file`) with optional JSON `metadata`
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<DocumentSummary>>, HubError> {
    let mut multipart =
        multipart.map_err(|e| HubError::validation(format!("Expected a multipart form: {}", e)))?;
    let limit = state.settings.max_upload_bytes;

    let mut upload = None;
    let mut metadata = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                upload = Some((filename, bytes));
            }
            "metadata" => {
                let raw = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if !raw.trim().is_empty() {
                    metadata = serde_json::from_str(&raw).map_err(|_| {
                        HubError::validation("metadata must be a JSON object")
                    })?;
                }
            }
            other => log::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| HubError::validation("file is required"))?;
    validate_upload(&filename, bytes.len() as u64, limit)?;
    let summary = state.documents.ingest(&filename, &bytes, metadata).await?;
    Ok(ok(summary))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DocumentInfo>>, HubError> {
    state
        .documents
        .get(&id)
        .await
        .map(|record| ok(record.info()))
        .ok_or(HubError::DocumentNotFound(id))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, HubError> {
    if !state.documents.delete(&id).await? {
        return Err(HubError::DocumentNotFound(id));
    }
    Ok(ok(json!({ "status": "success" })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub k: Option<usize>,
    /// JSON object of metadata values a document must carry
    pub filter: Option<String>,
}

pub async fn search_documents(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<DocumentHit>>>, HubError> {
    let Query(params) = params?;
    let query = params.query.trim();
    if query.is_empty() {
        return Err(HubError::validation("query cannot be empty"));
    }
    let k = params.k.unwrap_or(state.settings.search_k);

    let mut scope = SearchScope::default();
    if let Some(raw) = params.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        scope.metadata = serde_json::from_str(raw)
            .map_err(|_| HubError::validation("filter must be a JSON object"))?;
    }
    Ok(ok(state.documents.search(query, k, &scope).await))
}

