// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request/response types and handlers for the document QA endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::ApiError;
use super::http_server::AppState;
use crate::chat::{CompletionFailure, Message, ReplyStatus};
use crate::ingest::{ExtractedDocument, IngestReport};

/// Upload body shared by `/v1/ingest` and `/v1/extract`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    /// Original filename; the extension selects PDF or image handling
    pub filename: String,
    /// Base64-encoded file contents
    pub data: String,
}

impl DocumentUpload {
    /// Validate and decode the upload
    pub fn decode(&self, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
        if self.filename.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "filename".to_string(),
                message: "filename is required".to_string(),
            });
        }
        if self.data.is_empty() {
            return Err(ApiError::ValidationError {
                field: "data".to_string(),
                message: "data is required".to_string(),
            });
        }

        // Base64 inflates by 4/3; reject early before decoding
        let estimated = self.data.len() / 4 * 3;
        if estimated > max_bytes + 3 {
            return Err(ApiError::PayloadTooLarge {
                size: estimated,
                max: max_bytes,
            });
        }

        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| ApiError::ValidationError {
                field: "data".to_string(),
                message: format!("invalid base64: {}", e),
            })?;

        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    /// Omit to start a new session
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnResponse {
    pub session_id: String,
    pub reply: String,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CompletionFailure>,
    pub context_ids: Vec<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chunks_indexed: usize,
    pub sessions: usize,
    pub default_model: String,
}

/// POST /v1/ingest - Extract, embed and index a document
///
/// # Errors
/// - 400: missing filename, bad base64, unsupported document type
/// - 413: upload larger than the configured limit
/// - 422: no text could be extracted
/// - 503: image upload but no OCR backend configured
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<DocumentUpload>,
) -> Result<Json<IngestReport>, ApiError> {
    let bytes = request.decode(state.max_upload_bytes)?;
    debug!("Ingest request: {} ({} bytes)", request.filename, bytes.len());

    let report = state
        .assistant
        .ingest(&bytes, &request.filename)
        .await
        .map_err(|e| {
            warn!("Ingest of {} failed [{}]: {}", request.filename, e.error_code(), e);
            ApiError::from(e)
        })?;

    Ok(Json(report))
}

/// POST /v1/extract - Return a document's text without indexing it
pub async fn extract_handler(
    State(state): State<AppState>,
    Json(request): Json<DocumentUpload>,
) -> Result<Json<ExtractedDocument>, ApiError> {
    let bytes = request.decode(state.max_upload_bytes)?;

    let document = state
        .assistant
        .extract(&bytes, &request.filename)
        .await
        .map_err(|e| {
            warn!("Extract of {} failed [{}]: {}", request.filename, e.error_code(), e);
            ApiError::from(e)
        })?;

    Ok(Json(document))
}

/// POST /v1/chat - One chat turn
///
/// Model failures still answer 200 with `status: "failed"` and a `failure`
/// object; the turn is recorded in the session either way.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::ValidationError {
            field: "message".to_string(),
            message: "message is required".to_string(),
        });
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| {
            let id = Uuid::new_v4().to_string();
            info!("Starting new chat session {}", id);
            id
        });

    let reply = state
        .assistant
        .chat(
            &session_id,
            &request.message,
            request.model.as_deref().unwrap_or_default(),
        )
        .await;

    let (status, failure) = match reply.status {
        ReplyStatus::Completed => (TurnStatus::Completed, None),
        ReplyStatus::Failed(failure) => (TurnStatus::Failed, Some(failure)),
    };

    Ok(Json(ChatTurnResponse {
        session_id,
        reply: reply.text,
        status,
        failure,
        context_ids: reply.context_ids,
        model: reply.model,
    }))
}

/// GET /v1/sessions/:id/history
pub async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let messages = state.assistant.history(&session_id).await;
    Json(HistoryResponse {
        session_id,
        messages,
    })
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::version::VERSION.to_string(),
        chunks_indexed: state.assistant.chunk_count().await,
        sessions: state.assistant.session_count().await,
        default_model: state.assistant.default_model().to_string(),
    })
}

/// GET /version - Build and feature information
pub async fn version_handler() -> Json<serde_json::Value> {
    Json(crate::version::get_version_info())
}
