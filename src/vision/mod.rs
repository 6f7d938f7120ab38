// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image handling and OCR
//!
//! OCR is delegated to a vision chat model; this module validates and
//! normalises the image first.

pub mod image_utils;
pub mod ocr_client;

pub use image_utils::{decode_image_bytes, detect_format, prepare_for_ocr, ImageError, ImageInfo};
pub use ocr_client::VlmOcrClient;

use anyhow::Result;
use async_trait::async_trait;

/// OCR backend contract
///
/// Returns the recognised text, or an empty string when the image holds none.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, image_bytes: &[u8]) -> Result<String>;
}
