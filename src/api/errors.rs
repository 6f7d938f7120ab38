// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::extraction::ExtractionError;
use crate::ingest::IngestError;
use crate::vision::ImageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
    /// Document was readable but held no text
    NoText(String),
    ServiceUnavailable(String),
    InternalError {
        code: &'static str,
        message: String,
    },
    Timeout(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, code, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None, None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), None, Some(details))
            }
            ApiError::PayloadTooLarge { size, max } => {
                let mut details = HashMap::new();
                details.insert("size".to_string(), serde_json::Value::Number((*size).into()));
                details.insert("max".to_string(), serde_json::Value::Number((*max).into()));
                (
                    "payload_too_large",
                    format!("Upload of {} bytes exceeds the {} byte limit", size, max),
                    None,
                    Some(details),
                )
            }
            ApiError::NoText(msg) => ("no_text", msg.clone(), Some("NO_TEXT"), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None, None),
            ApiError::InternalError { code, message } => {
                ("internal_error", message.clone(), Some(*code), None)
            }
            ApiError::Timeout(msg) => ("timeout", msg.clone(), None, None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            code: code.map(str::to_string),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NoText(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::PayloadTooLarge { size, max } => {
                write!(f, "Payload too large: {} > {} bytes", size, max)
            }
            ApiError::NoText(msg) => write!(f, "No text: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError { code, message } => {
                write!(f, "Internal error [{}]: {}", code, message)
            }
            ApiError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        let code = error.error_code();
        match error {
            IngestError::EmptyUpload => ApiError::ValidationError {
                field: "data".to_string(),
                message: "upload is empty".to_string(),
            },
            IngestError::UnsupportedDocument(name) => ApiError::ValidationError {
                field: "filename".to_string(),
                message: format!(
                    "unsupported document '{}': expected a PDF or an image (png, jpg, tiff, webp, gif, bmp)",
                    name
                ),
            },
            IngestError::NoText { source_name } => {
                ApiError::NoText(format!("No text could be extracted from {}", source_name))
            }
            IngestError::Extraction(e) => match e {
                ExtractionError::OcrUnavailable => {
                    ApiError::ServiceUnavailable("OCR is not configured".to_string())
                }
                ExtractionError::Timeout(_) => ApiError::Timeout(e.to_string()),
                ExtractionError::Image(ImageError::TooLarge(size, max)) => {
                    ApiError::PayloadTooLarge { size, max }
                }
                e if e.is_client_error() => ApiError::InvalidRequest(e.to_string()),
                e => ApiError::InternalError {
                    code,
                    message: e.to_string(),
                },
            },
            IngestError::EmbeddingTimeout(_) => ApiError::Timeout(error.to_string()),
            other => ApiError::InternalError {
                code,
                message: other.to_string(),
            },
        }
    }
}
