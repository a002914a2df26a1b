// SPDX-License-Identifier: MIT

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State,
    },
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::envelope::{ok, ApiResponse};
use super::validation::{validate_chat_id, validate_message, validate_upload};
use super::{multipart_error, AppState};
use crate::adk::error::HubError;
use crate::agenthub::store::chats::{Chat, ChatMessage, ChatSummary};
use crate::agenthub::workflow::{WorkflowEvent, WorkflowOutcome, WorkflowRequest};

pub async fn create_chat(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let chat = state.chats.create().await;
    ok(json!({ "chatId": chat.id }))
}

pub async fn list_chats(State(state): State<AppState>) -> Json<ApiResponse<Vec<ChatSummary>>> {
    ok(state.chats.list().await)
}

async fn load_chat(state: &AppState, chat_id: &str) -> Result<Chat, HubError> {
    validate_chat_id(chat_id)?;
    state
        .chats
        .get(chat_id)
        .await
        .ok_or_else(|| HubError::ChatNotFound(chat_id.to_string()))
}

pub async fn chat_history(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, HubError> {
    let chat = load_chat(&state, &chat_id).await?;
    Ok(ok(chat.messages))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, HubError> {
    validate_chat_id(&chat_id)?;
    if !state.chats.delete(&chat_id).await {
        return Err(HubError::ChatNotFound(chat_id));
    }
    Ok(ok(json!({ "status": "success" })))
}

/// Send a message with optional file attachments (multipart form)
pub async fn send_message(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<WorkflowOutcome>>, HubError> {
    let mut multipart =
        multipart.map_err(|e| HubError::validation(format!("Expected a multipart form: {}", e)))?;
    let limit = state.settings.max_upload_bytes;
    let max_files = state.settings.max_attachments;

    let mut chat_id = None;
    let mut message = None;
    let mut uploads: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chat_id" => {
                chat_id = Some(field.text().await.map_err(|e| multipart_error(e, limit))?)
            }
            "message" => {
                message = Some(field.text().await.map_err(|e| multipart_error(e, limit))?)
            }
            "files" | "files[]" | "file" => {
                if uploads.len() >= max_files {
                    return Err(HubError::validation(format!(
                        "At most {} files can be attached to a message",
                        max_files
                    )));
                }
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                uploads.push((filename, bytes));
            }
            other => log::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let chat_id = chat_id.ok_or_else(|| HubError::validation("chat_id is required"))?;
    let chat = load_chat(&state, chat_id.trim()).await?;
    let message = validate_message(message.as_deref().unwrap_or_default())?;

    for (filename, bytes) in &uploads {
        validate_upload(filename, bytes.len() as u64, limit)?;
    }
    let mut document_ids = Vec::with_capacity(uploads.len());
    let mut filenames = Vec::with_capacity(uploads.len());
    for (filename, bytes) in uploads {
        let doc = state.documents.ingest(&filename, &bytes, Map::new()).await?;
        document_ids.push(doc.id);
        filenames.push(doc.filename);
    }

    let request = WorkflowRequest {
        message: message.clone(),
        history: chat.transcript(state.settings.history_window),
        document_ids,
        preset: None,
    };
    let outcome = state.workflow.run(request).await?;

    state
        .chats
        .append(
            &chat.id,
            vec![
                ChatMessage::user(message).with_files(filenames),
                ChatMessage::reply(outcome.message.clone()),
            ],
        )
        .await?;

    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub chat_id: String,
    pub message: String,
}

/// Run the workflow and stream its progress as server-sent events
pub async fn stream_message(
    State(state): State<AppState>,
    payload: Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HubError> {
    let Json(payload) = payload?;
    let chat = load_chat(&state, payload.chat_id.trim()).await?;
    let message = validate_message(&payload.message)?;

    let (tx, rx) = mpsc::channel(100);
    let request = WorkflowRequest {
        message: message.clone(),
        history: chat.transcript(state.settings.history_window),
        ..WorkflowRequest::default()
    };

    tokio::spawn(async move {
        log::info!("Starting streaming workflow for chat {}", chat.id);
        match state.workflow.run_stream(request, tx).await {
            Ok(outcome) => {
                let saved = state
                    .chats
                    .append(
                        &chat.id,
                        vec![
                            ChatMessage::user(message),
                            ChatMessage::reply(outcome.message),
                        ],
                    )
                    .await;
                if let Err(e) = saved {
                    log::warn!("Could not store streamed reply: {}", e);
                }
            }
            Err(e) => log::error!("Streaming workflow failed: {}", e),
        }
    });

    let stream = ReceiverStream::new(rx).map(|event: WorkflowEvent| {
        let name = event.name();
        Ok::<_, Infallible>(Event::default()
            .event(name)
            .json_data(&event)
            .unwrap_or_else(|e| {
                log::warn!("Could not encode {} event: {}", name, e);
                Event::default().event("error").data(e.to_string())
            }))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
