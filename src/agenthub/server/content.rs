// SPDX-License-Identifier: MIT

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{ok, ApiResponse};
use super::AppState;
use crate::adk::error::HubError;
use crate::agenthub::store::content::{ArtifactMetadata, StoredContent};
use crate::agenthub::workflow::types::TargetFormat;

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub content: String,
    pub format: String,
    pub filename: String,
}

/// Artifact id for a client-supplied filename: the stem of its last component
fn file_id_for(filename: &str) -> Option<String> {
    std::path::Path::new(filename.trim())
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn save_content(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, HubError> {
    let Json(request) = payload?;
    let format = TargetFormat::from_name(&request.format).ok_or_else(|| {
        HubError::validation(format!("Unsupported format '{}'", request.format))
    })?;
    let file_id = file_id_for(&request.filename)
        .ok_or_else(|| HubError::validation("filename cannot be empty"))?;

    let exists = tokio::fs::metadata(state.content.path_for(&file_id))
        .await
        .is_ok();
    let metadata = ArtifactMetadata::new(format.generation_type(), Some(format));
    let path = state
        .content
        .save(&file_id, &request.content, metadata, None, exists)
        .await?;

    Ok(ok(json!({
        "path": path.display().to_string(),
        "file_identifier": file_id,
    })))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<StoredContent>>, HubError> {
    state
        .content
        .retrieve(&file_id)
        .await
        .map(ok)
        .ok_or(HubError::ContentNotFound(file_id))
}
