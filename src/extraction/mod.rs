// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text extraction from uploaded documents
//!
//! - Images go through the configured OCR engine
//! - PDFs yield their text layer, followed by OCR of embedded images

pub mod errors;
pub mod pdf;

pub use errors::ExtractionError;

use async_trait::async_trait;
use image::ImageFormat;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::vision::image_utils::{
    decode_image_bytes, detect_format, format_from_extension, format_to_mime,
};
use crate::vision::OcrEngine;

/// Kind of document an upload holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image(ImageFormat),
}

impl DocumentKind {
    /// Resolve the kind from the filename extension, falling back to magic bytes
    pub fn resolve(filename: &str, bytes: &[u8]) -> Option<Self> {
        let by_extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| {
                if ext.eq_ignore_ascii_case("pdf") {
                    Some(DocumentKind::Pdf)
                } else {
                    format_from_extension(ext).map(DocumentKind::Image)
                }
            });

        by_extension.or_else(|| Self::sniff(bytes))
    }

    /// Detect the kind from content alone
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(DocumentKind::Pdf);
        }
        detect_format(bytes).ok().map(DocumentKind::Image)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Image(format) => format_to_mime(*format),
        }
    }
}

/// Text extraction contract
///
/// Returns an empty string when the document holds no text; genuine failures
/// surface as [`ExtractionError`].
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError>;
}

/// Default extractor combining PDF parsing with an optional OCR engine
pub struct DocumentExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl DocumentExtractor {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        if ocr.is_none() {
            warn!("No OCR engine configured: image uploads will be rejected and PDF images skipped");
        }
        Self { ocr }
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    async fn extract_image(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let ocr = self.ocr.as_ref().ok_or(ExtractionError::OcrUnavailable)?;

        // Reject corrupt or oversized uploads before spending an OCR call
        let owned = bytes.to_vec();
        let info = tokio::task::spawn_blocking(move || decode_image_bytes(&owned))
            .await
            .map_err(|e| ExtractionError::Ocr(format!("Image decoder crashed: {}", e)))?
            .map(|(_, info)| info)?;
        debug!(
            "Image {}x{} ({:?}, {} bytes) passed validation",
            info.width, info.height, info.format, info.size_bytes
        );

        ocr.recognize(bytes)
            .await
            .map_err(|e| ExtractionError::Ocr(e.to_string()))
    }

    async fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let owned = bytes.to_vec();
        let (page_text, images) = tokio::task::spawn_blocking(move || {
            match (pdf::extract_embedded_text(&owned), pdf::embedded_images(&owned)) {
                (Ok(text), Ok(images)) => Ok((text, images)),
                (Ok(text), Err(e)) => {
                    warn!("Could not scan PDF for images: {}", e);
                    Ok((text, Vec::new()))
                }
                // Scanned documents often defeat the text extractor; OCR may still read them
                (Err(e), Ok(images)) => {
                    warn!("PDF text layer unreadable, falling back to OCR only: {}", e);
                    Ok((String::new(), images))
                }
                (Err(e), Err(_)) => Err(e),
            }
        })
        .await
        .map_err(|e| ExtractionError::Pdf(format!("PDF parser crashed: {}", e)))??;

        let mut all_text = page_text;
        debug!(
            "PDF text layer: {} chars, {} embedded images",
            all_text.len(),
            images.len()
        );

        if let Some(ocr) = &self.ocr {
            for (index, image) in images.iter().enumerate() {
                // One unreadable image must not sink the whole document
                match ocr.recognize(image).await {
                    Ok(text) if !text.trim().is_empty() => {
                        if !all_text.is_empty() && !all_text.ends_with('\n') {
                            all_text.push('\n');
                        }
                        all_text.push_str(&text);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("OCR of PDF image {} failed: {}", index, e),
                }
            }
        }

        Ok(all_text)
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
        let text = match kind {
            DocumentKind::Pdf => self.extract_pdf(bytes).await?,
            DocumentKind::Image(_) => self.extract_image(bytes).await?,
        };
        info!("Extracted {} chars from {}", text.len(), kind.mime_type());
        Ok(text)
    }
}
