// SPDX-License-Identifier: MIT

//! Response envelope
//!
//! Success bodies are `{success: true, data}`; failures are
//! `{success: false, error: {code, message}}` with a status derived from
//! the error variant.

use crate::adk::error::HubError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

pub fn status_code(err: &HubError) -> StatusCode {
    match err {
        HubError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HubError::ChatNotFound(_)
        | HubError::ContentNotFound(_)
        | HubError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
        HubError::FileProcessing(_) => StatusCode::BAD_REQUEST,
        HubError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_code(err: &HubError) -> &'static str {
    match err {
        HubError::Validation(_) => "VALIDATION_ERROR",
        HubError::ChatNotFound(_) => "CHAT_NOT_FOUND",
        HubError::ContentNotFound(_) => "CONTENT_NOT_FOUND",
        HubError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
        HubError::FileProcessing(_) => "FILE_PROCESSING_ERROR",
        HubError::FileTooLarge { .. } => "FILE_TOO_LARGE",
        HubError::Workflow(_)
        | HubError::Model(_)
        | HubError::Api { .. }
        | HubError::ToolNotFound { .. } => "WORKFLOW_ERROR",
        _ => "INTERNAL_ERROR",
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let code = error_code(&self);
        let message = self.to_string();

        if status.is_server_error() {
            log::error!("{} ({}): {}", code, status, message);
        } else {
            log::debug!("{} ({}): {}", code, status, message);
        }

        let body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for HubError {
    fn from(rejection: JsonRejection) -> Self {
        HubError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for HubError {
    fn from(rejection: QueryRejection) -> Self {
        HubError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}
