// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision-model OCR client via OpenAI-compatible API

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::image_utils::prepare_for_ocr;
use super::OcrEngine;
use crate::chat::wire::{error_message, ChatMessage, ChatRequest, ChatResponse};

const OCR_PROMPT: &str = "Extract all text from this image. Return only the extracted text, preserving the original layout and formatting as much as possible. If no text is found, respond with an empty string.";

/// Replies some models give instead of an empty string when nothing is legible
const EMPTY_MARKERS: &[&str] = &["\"\"", "''", "(empty)", "[empty]"];

/// Client that asks a vision chat model to transcribe images
pub struct VlmOcrClient {
    client: Client,
    endpoint: String,
    model_name: String,
    api_key: Option<String>,
}

impl VlmOcrClient {
    /// Create a new OCR client
    ///
    /// `endpoint` is the API base including the version segment, e.g.
    /// `https://openrouter.ai/api/v1`.
    pub fn new(
        endpoint: &str,
        model_name: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "OCR client configured: endpoint={}, model={}",
            endpoint, model_name
        );

        Ok(Self {
            client,
            endpoint,
            model_name: model_name.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn build_request(&self, data_url: String) -> ChatRequest {
        ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {"type": "text", "text": OCR_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: Some(4096),
            temperature: 0.1,
        }
    }
}

#[async_trait]
impl OcrEngine for VlmOcrClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn recognize(&self, image_bytes: &[u8]) -> Result<String> {
        let start = std::time::Instant::now();
        let image = prepare_for_ocr(image_bytes)?;
        debug!(
            "OCR image: {}x{}, {} bytes",
            image.info.width, image.info.height, image.info.size_bytes
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&self.build_request(image.data_url()));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "OCR request failed with status {}: {}",
                status,
                error_message(&body)
            ));
        }

        let chat_response: ChatResponse = response.json().await?;
        let text = normalize_ocr_text(chat_response.first_content().unwrap_or_default());

        info!(
            "OCR complete: {} chars, {}ms (model: {})",
            text.len(),
            start.elapsed().as_millis(),
            self.model_name
        );

        Ok(text)
    }
}

/// Trim the model reply and map "nothing found" markers to an empty string
fn normalize_ocr_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if EMPTY_MARKERS.contains(&trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}
