// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document text extraction

use std::time::Duration;
use thiserror::Error;

use crate::vision::ImageError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Upload could not be decoded as the image it claims to be
    #[error("Invalid image: {0}")]
    Image(#[from] ImageError),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    /// An image needs OCR but no OCR backend is configured
    #[error("OCR is not configured")]
    OcrUnavailable,

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),
}

impl ExtractionError {
    /// Get error code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            ExtractionError::Image(_) => "INVALID_IMAGE",
            ExtractionError::Pdf(_) => "PDF_ERROR",
            ExtractionError::OcrUnavailable => "OCR_UNAVAILABLE",
            ExtractionError::Ocr(_) => "OCR_FAILED",
            ExtractionError::Timeout(_) => "TIMEOUT",
        }
    }

    /// True when the problem lies with the uploaded bytes rather than the node
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExtractionError::Image(_) | ExtractionError::Pdf(_))
    }
}
