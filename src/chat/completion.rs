// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote chat completion via an OpenAI-compatible API (OpenRouter by default)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::session_store::Role;
use super::wire::{error_message, ChatMessage, ChatRequest, ChatResponse};

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// One message of a completion prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl PromptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        }
    }
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Why a completion did not produce a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    Auth,
    RateLimit,
    Network,
    InvalidResponse,
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("Completion timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Completion failed: {0}")]
    Unknown(String),
}

impl CompletionError {
    pub fn reason(&self) -> FailureReason {
        match self {
            CompletionError::Timeout { .. } => FailureReason::Timeout,
            CompletionError::Auth(_) => FailureReason::Auth,
            CompletionError::RateLimit(_) => FailureReason::RateLimit,
            CompletionError::Network(_) => FailureReason::Network,
            CompletionError::InvalidResponse(_) => FailureReason::InvalidResponse,
            CompletionError::Unknown(_) => FailureReason::Unknown,
        }
    }

    /// Get error code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            CompletionError::Timeout { .. } => "COMPLETION_TIMEOUT",
            CompletionError::Auth(_) => "COMPLETION_AUTH",
            CompletionError::RateLimit(_) => "COMPLETION_RATE_LIMIT",
            CompletionError::Network(_) => "COMPLETION_NETWORK",
            CompletionError::InvalidResponse(_) => "COMPLETION_INVALID_RESPONSE",
            CompletionError::Unknown(_) => "COMPLETION_FAILED",
        }
    }

    /// Short text suitable for showing to the person chatting
    pub fn user_message(&self) -> String {
        match self {
            CompletionError::Timeout { after } => {
                format!("The model did not answer within {:?}. Please try again.", after)
            }
            CompletionError::Auth(_) => {
                "The model provider rejected the API key. Check OPENROUTER_API_KEY.".to_string()
            }
            CompletionError::RateLimit(_) => {
                "The model provider is rate limiting requests. Please wait and retry.".to_string()
            }
            CompletionError::Network(_) => "Could not reach the model provider.".to_string(),
            CompletionError::InvalidResponse(_) => {
                "The model returned a response that could not be read.".to_string()
            }
            CompletionError::Unknown(detail) => format!("The model call failed: {}", detail),
        }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("{}: {}", status, error_message(body));
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Auth(detail),
            StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimit(detail),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                CompletionError::Network(detail)
            }
            _ => CompletionError::Unknown(detail),
        }
    }
}

/// Completion backend contract
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError>;
}

/// OpenRouter (or any OpenAI-compatible) chat completion client
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        info!(
            "Completion client configured: base_url={}, api_key={}",
            base_url,
            if api_key.is_some() { "set" } else { "missing" }
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, model: &str, messages: &[PromptMessage]) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: serde_json::Value::String(m.content.clone()),
                })
                .collect(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    fn map_transport_error(&self, error: reqwest::Error) -> CompletionError {
        if error.is_timeout() {
            CompletionError::Timeout {
                after: self.timeout,
            }
        } else if error.is_connect() || error.is_request() {
            CompletionError::Network(error.to_string())
        } else if error.is_decode() {
            CompletionError::InvalidResponse(error.to_string())
        } else {
            CompletionError::Unknown(error.to_string())
        }
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        let start = std::time::Instant::now();
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&self.build_request(model, messages));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let text = body
            .first_content()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CompletionError::InvalidResponse("no message content".to_string()))?
            .to_string();

        debug!(
            "Completion from {} in {}ms ({} tokens)",
            body.model.as_deref().unwrap_or(model),
            start.elapsed().as_millis(),
            body.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0)
        );

        Ok(text)
    }
}
