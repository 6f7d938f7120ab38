// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session chat manager
//!
//! A turn embeds the message, retrieves context, calls the completion
//! service and appends the user/assistant pair to the session. Network calls
//! never run under a lock; the session lock is held only for the append.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::completion::{CompletionError, CompletionService, FailureReason};
use super::prompt::{build_prompt, context_from_hits};
use super::session_store::{Message, SessionStore};
use crate::embeddings::Embedder;
use crate::vector::{SearchHit, SharedVectorStore};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MODEL: &str = "openrouter/auto";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub top_k: usize,
    /// Upper bound for each embedding or completion call
    pub timeout: Duration,
    pub default_model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl From<&CompletionError> for CompletionFailure {
    fn from(error: &CompletionError) -> Self {
        Self {
            reason: error.reason(),
            detail: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyStatus {
    Completed,
    Failed(CompletionFailure),
}

/// Result of one chat turn
///
/// `text` is always non-empty: the model's answer, or a readable error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub status: ReplyStatus,
    /// Ids of the chunks retrieved as context, in rank order
    pub context_ids: Vec<String>,
    pub model: String,
}

impl ChatReply {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ReplyStatus::Completed)
    }

    pub fn failure(&self) -> Option<&CompletionFailure> {
        match &self.status {
            ReplyStatus::Completed => None,
            ReplyStatus::Failed(failure) => Some(failure),
        }
    }
}

pub struct ChatManager {
    sessions: SessionStore,
    store: SharedVectorStore,
    embedder: Option<Arc<dyn Embedder>>,
    completion: Arc<dyn CompletionService>,
    config: ChatConfig,
}

impl ChatManager {
    pub fn new(
        store: SharedVectorStore,
        embedder: Option<Arc<dyn Embedder>>,
        completion: Arc<dyn CompletionService>,
        config: ChatConfig,
    ) -> Self {
        if embedder.is_none() {
            warn!("Chat manager has no embedder; replies will not use document context");
        }
        Self {
            sessions: SessionStore::new(),
            store,
            embedder,
            completion,
            config,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run one chat turn
    ///
    /// Never fails: completion errors come back as a reply with
    /// [`ReplyStatus::Failed`], and the turn is still recorded in history.
    pub async fn handle_message(&self, session_id: &str, message: &str, model_name: &str) -> ChatReply {
        let start = std::time::Instant::now();
        let model = if model_name.trim().is_empty() {
            self.config.default_model.clone()
        } else {
            model_name.trim().to_string()
        };

        let hits = self.retrieve(message).await;
        let context = context_from_hits(&hits);
        let context_ids: Vec<String> = hits.into_iter().map(|hit| hit.id).collect();

        let history = self.sessions.history(session_id).await;
        let prompt = build_prompt(&context, &history, message);
        debug!(
            "Session {}: prompt has {} messages, {} context chunks",
            session_id,
            prompt.len(),
            context_ids.len()
        );

        let outcome = match tokio::time::timeout(
            self.config.timeout,
            self.completion.complete(&model, &prompt),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                after: self.config.timeout,
            }),
        };

        let (text, status) = match outcome {
            Ok(text) => (text, ReplyStatus::Completed),
            Err(e) => {
                warn!(
                    "Session {}: completion failed [{}]: {}",
                    session_id,
                    e.error_code(),
                    e
                );
                (e.user_message(), ReplyStatus::Failed(CompletionFailure::from(&e)))
            }
        };

        self.sessions.append_turn(session_id, message, &text).await;

        info!(
            "Session {}: turn finished in {}ms (model: {}, completed: {})",
            session_id,
            start.elapsed().as_millis(),
            model,
            matches!(status, ReplyStatus::Completed)
        );

        ChatReply {
            text,
            status,
            context_ids,
            model,
        }
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions.history(session_id).await
    }

    /// Nearest chunks for `message`; any failure degrades to no context
    async fn retrieve(&self, message: &str) -> Vec<SearchHit> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };

        let texts = vec![message.to_string()];
        let vector = match tokio::time::timeout(self.config.timeout, embedder.embed(&texts)).await {
            Ok(Ok(mut vectors)) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(Ok(_)) => {
                warn!("Embedder returned no vector; continuing without context");
                return Vec::new();
            }
            Ok(Err(e)) => {
                warn!("Embedding failed, continuing without context: {}", e);
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    "Embedding timed out after {:?}, continuing without context",
                    self.config.timeout
                );
                return Vec::new();
            }
        };

        let store = self.store.read().await;
        match store.query(&vector, self.config.top_k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Retrieval failed [{}]: {}", e.error_code(), e);
                Vec::new()
            }
        }
    }
}
