// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upward-facing facade over ingestion and chat
//!
//! Both halves share one vector store; the HTTP layer and the binary only
//! talk to [`DocumentAssistant`].

use crate::chat::{ChatManager, ChatReply, Message};
use crate::ingest::{ExtractedDocument, IngestError, IngestReport, IngestionPipeline};
use crate::vector::SharedVectorStore;

pub struct DocumentAssistant {
    pipeline: IngestionPipeline,
    chat: ChatManager,
    store: SharedVectorStore,
}

impl DocumentAssistant {
    pub fn new(pipeline: IngestionPipeline, chat: ChatManager) -> Self {
        let store = pipeline.store().clone();
        Self {
            pipeline,
            chat,
            store,
        }
    }

    /// Extract, split, embed and index a document
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<IngestReport, IngestError> {
        self.pipeline.ingest(bytes, filename).await
    }

    /// Extract a document's text without indexing it
    pub async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<ExtractedDocument, IngestError> {
        self.pipeline.extract_only(bytes, filename).await
    }

    pub async fn chat(&self, session_id: &str, message: &str, model_name: &str) -> ChatReply {
        self.chat.handle_message(session_id, message, model_name).await
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.chat.history(session_id).await
    }

    pub async fn chunk_count(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.chat.sessions().session_count().await
    }

    pub fn default_model(&self) -> &str {
        &self.chat.config().default_model
    }
}
