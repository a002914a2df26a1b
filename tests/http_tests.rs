//! HTTP API tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! outbound retry behaviour is checked against a throwaway local server.

use agenthub_rs::adk::error::HubError;
use agenthub_rs::adk::http::{HttpOptions, RetryPolicy};
use agenthub_rs::adk::model::{Content, GenerationConfig, Model};
use agenthub_rs::adk::tool::Tool;
use agenthub_rs::agenthub::config::Settings;
use agenthub_rs::agenthub::server::{router, AppState};
use agenthub_rs::agenthub::tools::WebSearchTool;
use agenthub_rs::agenthub::workflow::models::Models;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Classifies everything as simple and answers "pong"
struct PongModel;

#[async_trait]
impl Model for PongModel {
    async fn generate_content(
        &self,
        history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, HubError> {
        let system = history.first().map(Content::text).unwrap_or_default();
        if system.contains("query classification agent") {
            Ok(Content::model(r#"{"query_type": "simple"}"#))
        } else {
            Ok(Content::model("pong"))
        }
    }
}

const MAX_UPLOAD: u64 = 1024;
const BOUNDARY: &str = "agenthub-test-boundary";

async fn app() -> (Router, TempDir) {
    app_with_upload_limit(MAX_UPLOAD).await
}

async fn app_with_upload_limit(max_upload_bytes: u64) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        content_dir: dir.path().join("content"),
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes,
        max_attachments: 3,
        ..Settings::default()
    };
    let state = AppState::new(settings, Models::uniform(Arc::new(PongModel), 0.2))
        .await
        .unwrap();
    (router(state), dir)
}

enum Field<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(fields: &[Field<'_>]) -> Body {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match field {
            Field::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Field::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, fields: &[Field<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart(fields))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn new_chat(app: &Router) -> String {
    let (status, body) = send(app, empty_request("POST", "/chat/new")).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["chatId"].as_str().unwrap().to_string()
}

// ============================================================================
// Chats
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _dir) = app().await;
    let (status, body) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {"status": "healthy"}}));
}

#[tokio::test]
async fn test_chat_round_trip() {
    let (app, _dir) = app().await;
    let chat_id = new_chat(&app).await;

    let (status, body) = send(
        &app,
        multipart_request(
            "/chat/message",
            &[
                Field::Text("chat_id", &chat_id),
                Field::Text("message", "  ping  "),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["message"], "pong");
    assert_eq!(body["data"]["canvas_content"], Value::Null);
    assert_eq!(body["data"]["task_status"]["query_type"], "simple");

    let (status, body) = send(
        &app,
        empty_request("GET", &format!("/chat/{chat_id}/history")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], "user");
    assert_eq!(messages[0]["text"], "ping");
    assert_eq!(messages[1]["type"], "reply");
    assert_eq!(messages[1]["text"], "pong");

    let (_, body) = send(&app, empty_request("GET", "/chat/list")).await;
    let chats = body["data"].as_array().unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["id"], chat_id.as_str());
    assert_eq!(chats[0]["message_count"], 2);

    let (status, body) = send(&app, empty_request("DELETE", &format!("/chat/{chat_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "success");

    let (status, _) = send(
        &app,
        empty_request("GET", &format!("/chat/{chat_id}/history")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_message_with_attachment_records_file() {
    let (app, _dir) = app().await;
    let chat_id = new_chat(&app).await;

    let (status, body) = send(
        &app,
        multipart_request(
            "/chat/message",
            &[
                Field::Text("chat_id", &chat_id),
                Field::Text("message", "summarize the notes"),
                Field::File("files", "notes.txt", b"ping pong notes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["task_status"]["document_processed"], true);

    let (_, body) = send(
        &app,
        empty_request("GET", &format!("/chat/{chat_id}/history")),
    )
    .await;
    assert_eq!(body["data"][0]["files"], json!(["notes.txt"]));
}

#[tokio::test]
async fn test_message_accepts_several_large_attachments() {
    let (app, _dir) = app_with_upload_limit(100 * 1024).await;
    let chat_id = new_chat(&app).await;
    let first = vec![b'a'; 90 * 1024];
    let second = vec![b'b'; 90 * 1024];

    let (status, body) = send(
        &app,
        multipart_request(
            "/chat/message",
            &[
                Field::Text("chat_id", &chat_id),
                Field::Text("message", "compare these"),
                Field::File("files", "first.txt", &first),
                Field::File("files", "second.txt", &second),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = send(
        &app,
        empty_request("GET", &format!("/chat/{chat_id}/history")),
    )
    .await;
    assert_eq!(body["data"][0]["files"], json!(["first.txt", "second.txt"]));
}

#[tokio::test]
async fn test_too_many_attachments_is_validation_error() {
    let (app, _dir) = app().await;
    let chat_id = new_chat(&app).await;

    let (status, body) = send(
        &app,
        multipart_request(
            "/chat/message",
            &[
                Field::Text("chat_id", &chat_id),
                Field::Text("message", "read all of these"),
                Field::File("files", "a.txt", b"a"),
                Field::File("files", "b.txt", b"b"),
                Field::File("files", "c.txt", b"c"),
                Field::File("files", "d.txt", b"d"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_chat_is_404_envelope() {
    let (app, _dir) = app().await;
    let (status, body) = send(
        &app,
        empty_request("GET", "/chat/0badc0de-0000-4000-8000-000000000000/history"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "CHAT_NOT_FOUND");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("0badc0de-0000-4000-8000-000000000000"));
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, _dir) = app().await;

    let (status, body) = send(&app, empty_request("DELETE", "/chat/NOT_A_CHAT")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let chat_id = new_chat(&app).await;
    let (status, body) = send(
        &app,
        multipart_request(
            "/chat/message",
            &[Field::Text("chat_id", &chat_id), Field::Text("message", "   ")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let long = "x".repeat(4001);
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/chat/message/stream",
            json!({"chat_id": chat_id, "message": long}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        json_request("POST", "/chat/message/stream", json!({"chat": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_stream_emits_workflow_events() {
    let (app, _dir) = app().await;
    let chat_id = new_chat(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/chat/message/stream",
            json!({"chat_id": chat_id, "message": "ping"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("event: classified"), "{text}");
    assert!(text.contains("event: answer"), "{text}");
    assert!(text.contains("\"message\":\"pong\""), "{text}");
}

// ============================================================================
// Documents and Content
// ============================================================================

#[tokio::test]
async fn test_upload_and_search_documents() {
    let (app, _dir) = app().await;

    let (status, body) = send(
        &app,
        multipart_request(
            "/documents/upload",
            &[
                Field::File("file", "runtime.md", b"The tokio runtime schedules tasks."),
                Field::Text("metadata", r#"{"team": "platform"}"#),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["filename"], "runtime.md");
    assert_eq!(body["data"]["chunks"], 1);

    let (status, body) = send(
        &app,
        empty_request("GET", "/documents/search?query=tokio%20runtime&k=2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0]["content"].as_str().unwrap().contains("schedules"));
    assert_eq!(hits[0]["metadata"]["team"], "platform");
}

#[tokio::test]
async fn test_document_lookup_filter_and_delete() {
    let (app, _dir) = app().await;

    let (_, body) = send(
        &app,
        multipart_request(
            "/documents/upload",
            &[
                Field::File("file", "deploy.md", b"Deploy the service with docker."),
                Field::Text("metadata", r#"{"team": "platform"}"#),
            ],
        ),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    send(
        &app,
        multipart_request(
            "/documents/upload",
            &[
                Field::File("file", "etl.md", b"The ETL job runs in docker."),
                Field::Text("metadata", r#"{"team": "data"}"#),
            ],
        ),
    )
    .await;

    let (status, body) = send(&app, empty_request("GET", &format!("/documents/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["filename"], "deploy.md");
    assert_eq!(body["data"]["metadata"]["team"], "platform");

    let (status, body) = send(
        &app,
        empty_request(
            "GET",
            "/documents/search?query=docker&filter=%7B%22team%22%3A%22data%22%7D",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["metadata"]["filename"], "etl.md");

    let (status, body) = send(
        &app,
        empty_request("GET", "/documents/search?query=docker&filter=nope"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, empty_request("DELETE", &format!("/documents/{id}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, empty_request("GET", &format!("/documents/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "DOCUMENT_NOT_FOUND");

    let (_, body) = send(&app, empty_request("GET", "/documents/search?query=docker")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, empty_request("DELETE", &format!("/documents/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let (app, _dir) = app().await;
    let big = vec![b'a'; MAX_UPLOAD as usize + 1];

    let (status, body) = send(
        &app,
        multipart_request("/documents/upload", &[Field::File("file", "big.txt", &big)]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn test_disallowed_extension_is_rejected() {
    let (app, _dir) = app().await;
    let (status, body) = send(
        &app,
        multipart_request(
            "/documents/upload",
            &[Field::File("file", "tool.exe", b"MZ")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "FILE_PROCESSING_ERROR");
}

#[tokio::test]
async fn test_save_and_fetch_content() {
    let (app, _dir) = app().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/save",
            json!({"content": "# Plan", "format": "markdown", "filename": "release_plan.md"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["file_identifier"], "release_plan");
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .ends_with("release_plan.json"));

    let (status, body) = send(&app, empty_request("GET", "/content/release_plan")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "# Plan");
    assert_eq!(body["data"]["metadata"]["format"], "md");

    let (status, body) = send(&app, empty_request("GET", "/content/zzz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "CONTENT_NOT_FOUND");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/save",
            json!({"content": "x", "format": "exe", "filename": "bad"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_websearch_without_service_returns_empty() {
    let (app, _dir) = app().await;
    let (status, body) = send(&app, empty_request("GET", "/websearch/search?query=rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"query": "rust", "results": []}));
}

// ============================================================================
// Outbound Retry
// ============================================================================

#[tokio::test]
async fn test_web_search_retries_transient_failure() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let upstream = Router::new().route(
        "/search",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"detail": "warming up"})),
                    )
                } else {
                    (
                        StatusCode::OK,
                        Json(json!({"results": [{"title": "Rust 2024 edition"}]})),
                    )
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let options = HttpOptions {
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(3).with_base_delay(Duration::from_millis(10)),
    };
    let base = format!("http://{addr}/").parse().unwrap();
    let tool = WebSearchTool::new(Some(base), &options).unwrap();

    let output = tool.execute(json!({"query": "rust edition"})).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(output["query"], "rust edition");
    assert_eq!(output["results"][0]["title"], "Rust 2024 edition");
}

#[tokio::test]
async fn test_web_search_gives_up_after_max_attempts() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let upstream = Router::new().route(
        "/search",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let options = HttpOptions {
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(2).with_base_delay(Duration::from_millis(10)),
    };
    let base = format!("http://{addr}/").parse().unwrap();
    let tool = WebSearchTool::new(Some(base), &options).unwrap();

    let err = tool.execute(json!({"query": "rust"})).await.unwrap_err();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(matches!(err, HubError::Api { .. }), "{err:?}");
}
