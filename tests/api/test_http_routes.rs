// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// HTTP routes exercised through the router with stub collaborators

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use docqa_node::api::{build_router, AppState};
use docqa_node::chat::{
    ChatConfig, ChatManager, CompletionError, CompletionService, PromptMessage,
};
use docqa_node::embeddings::{Embedder, HashEmbedder};
use docqa_node::extraction::{DocumentExtractor, DocumentKind, ExtractionError, TextExtractor};
use docqa_node::ingest::{IngestionPipeline, TextSplitter};
use docqa_node::vector::VectorStore;
use docqa_node::vision::OcrEngine;
use docqa_node::DocumentAssistant;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Treats the upload bytes as UTF-8 text
struct Utf8Extractor;

#[async_trait]
impl TextExtractor for Utf8Extractor {
    async fn extract(&self, bytes: &[u8], _kind: DocumentKind) -> Result<String, ExtractionError> {
        Ok(String::from_utf8_lossy(bytes).trim_start_matches("%PDF-1.4").to_string())
    }
}

struct CannedOcr;

#[async_trait]
impl OcrEngine for CannedOcr {
    fn name(&self) -> &str {
        "canned"
    }

    async fn recognize(&self, _image_bytes: &[u8]) -> anyhow::Result<String> {
        Ok("Receipt total 9.99".to_string())
    }
}

struct CannedCompletion;

#[async_trait]
impl CompletionService for CannedCompletion {
    async fn complete(
        &self,
        _model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        if messages.iter().any(|m| m.content.contains("fail please")) {
            return Err(CompletionError::Auth("401 Unauthorized".to_string()));
        }
        Ok("The total is 42.".to_string())
    }
}

fn app(max_upload_bytes: usize) -> Router {
    app_with(Arc::new(Utf8Extractor), max_upload_bytes)
}

fn app_with(extractor: Arc<dyn TextExtractor>, max_upload_bytes: usize) -> Router {
    let store = VectorStore::new().shared();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(32).unwrap());
    let timeout = Duration::from_secs(5);

    let pipeline = IngestionPipeline::new(
        extractor,
        embedder.clone(),
        store.clone(),
        TextSplitter::new(200, 20).unwrap(),
        timeout,
    );
    let chat = ChatManager::new(
        store,
        Some(embedder),
        Arc::new(CannedCompletion),
        ChatConfig {
            timeout,
            ..ChatConfig::default()
        },
    );

    let assistant = Arc::new(DocumentAssistant::new(pipeline, chat));
    build_router(AppState::new(assistant, max_upload_bytes))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload(filename: &str, contents: &[u8]) -> Value {
    json!({ "filename": filename, "data": STANDARD.encode(contents) })
}

#[tokio::test]
async fn test_health() {
    let app = app(1024 * 1024);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chunksIndexed"], 0);
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_version_lists_features() {
    let app = app(1024 * 1024);
    let (status, body) = send(&app, get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "pdf-image-ocr"));
}

#[tokio::test]
async fn test_chat_round_trip_and_history() {
    let app = app(1024 * 1024);

    let (status, body) = send(
        &app,
        post_json("/v1/chat", json!({ "sessionId": "s1", "message": "what is the total?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "s1");
    assert_eq!(body["reply"], "The total is 42.");
    assert_eq!(body["status"], "completed");
    assert!(body.get("failure").is_none());

    let (status, body) = send(&app, get("/v1/sessions/s1/history")).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["text"], "what is the total?");
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_chat_without_session_id_creates_one() {
    let app = app(1024 * 1024);
    let (status, body) = send(&app, post_json("/v1/chat", json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);

    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());

    let (_, history) = send(&app, get(&format!("/v1/sessions/{}/history", session_id))).await;
    assert_eq!(history["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_chat_is_still_200() {
    let app = app(1024 * 1024);
    let (status, body) = send(
        &app,
        post_json("/v1/chat", json!({ "sessionId": "s", "message": "fail please" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["failure"]["reason"], "auth");
    assert!(!body["reply"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let app = app(1024 * 1024);
    let (status, body) = send(&app, post_json("/v1/chat", json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "validation_error");
}

#[tokio::test]
async fn test_unknown_session_history_is_empty() {
    let app = app(1024 * 1024);
    let (status, body) = send(&app, get("/v1/sessions/nobody/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_ingest_then_chat_uses_context() {
    let app = app(1024 * 1024);

    let (status, report) = send(
        &app,
        post_json(
            "/v1/ingest",
            upload("invoice.pdf", b"%PDF-1.4 Invoice 1001 total amount 42 euros"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sourceName"], "invoice.pdf");
    assert_eq!(report["chunksIndexed"], 1);

    let (_, body) = send(
        &app,
        post_json("/v1/chat", json!({ "sessionId": "s", "message": "invoice total amount" })),
    )
    .await;
    let context_ids = body["contextIds"].as_array().unwrap();
    assert_eq!(context_ids.len(), 1);
    assert_eq!(
        context_ids[0],
        format!("{}:0", report["documentId"].as_str().unwrap())
    );

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["chunksIndexed"], 1);
}

#[tokio::test]
async fn test_extract_does_not_index() {
    let app = app(1024 * 1024);
    let (status, body) = send(
        &app,
        post_json("/v1/extract", upload("memo.pdf", b"%PDF-1.4 Memo text")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], " Memo text");
    assert_eq!(body["mimeType"], "application/pdf");

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["chunksIndexed"], 0);
}

#[tokio::test]
async fn test_ingest_error_statuses() {
    let app = app(64);

    let (status, _) = send(&app, post_json("/v1/ingest", upload("empty.pdf", b"%PDF-1.4   "))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, post_json("/v1/ingest", upload("notes.docx", b"PK\x03\x04"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post_json("/v1/ingest", upload("big.pdf", &[b'a'; 200]))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["errorType"], "payload_too_large");

    let (status, _) = send(
        &app,
        post_json("/v1/ingest", json!({ "filename": "a.pdf", "data": "%%%" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_corrupt_image_is_client_error() {
    let ocr: Arc<dyn OcrEngine> = Arc::new(CannedOcr);
    let app = app_with(Arc::new(DocumentExtractor::new(Some(ocr))), 32 * 1024 * 1024);

    let mut corrupt = vec![0x89, b'P', b'N', b'G'];
    corrupt.extend_from_slice(&[0; 64]);
    let (status, body) = send(&app, post_json("/v1/ingest", upload("scan.png", &corrupt))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "invalid_request");

    // Over the decoder's limit but under the upload limit
    let mut huge = vec![0x89, b'P', b'N', b'G'];
    huge.resize(11 * 1024 * 1024, 0);
    let (status, _) = send(&app, post_json("/v1/ingest", upload("huge.png", &huge))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["chunksIndexed"], 0);
}
