// SPDX-License-Identifier: MIT

//! HTTP API

mod chat;
mod content;
mod documents;
pub mod envelope;
mod search;
pub mod validation;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit},
    http::{HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::adk::error::HubError;
use crate::agenthub::config::Settings;
use crate::agenthub::registry::ToolRegistry;
use crate::agenthub::store::{ChatStore, ContentStore, DocumentStore, InMemoryChatStore};
use crate::agenthub::tools::{DocumentSearchTool, WebSearchTool};
use crate::agenthub::workflow::models::Models;
use crate::agenthub::workflow::Workflow;
use envelope::ApiResponse;

/// Room for multipart framing and text fields on top of the attachment limits
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub chats: Arc<dyn ChatStore>,
    pub documents: Arc<DocumentStore>,
    pub content: Arc<ContentStore>,
    pub registry: ToolRegistry,
    pub workflow: Arc<Workflow>,
}

impl AppState {
    /// Wire stores, tools and the workflow from settings
    pub async fn new(settings: Settings, models: Models) -> Result<Self, HubError> {
        let content = Arc::new(ContentStore::new(&settings.content_dir));
        let documents = Arc::new(DocumentStore::new(
            &settings.upload_dir,
            settings.chunk_size,
            settings.chunk_overlap,
        ));

        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(WebSearchTool::new(
                settings.websearch_url()?,
                &settings.http_options(),
            )?))
            .await;
        registry
            .register(Arc::new(DocumentSearchTool::new(
                documents.clone(),
                settings.search_k,
            )))
            .await;

        let workflow = Arc::new(Workflow::new(
            models,
            registry.clone(),
            content.clone(),
            settings.search_k,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            chats: Arc::new(InMemoryChatStore::new()),
            documents,
            content,
            registry,
            workflow,
        })
    }

    pub fn with_chat_store(mut self, chats: Arc<dyn ChatStore>) -> Self {
        self.chats = chats;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.max_request_bytes() as usize + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat/new", post(chat::create_chat))
        .route("/chat/list", get(chat::list_chats))
        .route("/chat/message", post(chat::send_message))
        .route("/chat/message/stream", post(chat::stream_message))
        .route("/chat/{id}/history", get(chat::chat_history))
        .route("/chat/{id}", delete(chat::delete_chat))
        .route("/documents/upload", post(documents::upload_document))
        .route("/documents/search", get(documents::search_documents))
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/websearch/search", get(search::web_search))
        .route("/save", post(content::save_content))
        .route("/content/{file_id}", get(content::get_content))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(settings: Settings, models: Models) -> Result<(), HubError> {
    let addr = settings.addr().await?;
    let state = AppState::new(settings, models).await?;
    log::info!(
        "Registered tools: {}",
        state.registry.names().await.join(", ")
    );
    let app = router(state);

    log::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    log::info!("Shutting down");
}

async fn health_check() -> Json<ApiResponse<Value>> {
    envelope::ok(json!({ "status": "healthy" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| log::warn!("Ignoring invalid CORS origin: {}", o))
                .ok()
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Oversized bodies surface as a multipart error carrying 413
fn multipart_error(err: MultipartError, limit: u64) -> HubError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HubError::FileTooLarge { limit_bytes: limit }
    } else {
        HubError::validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}
