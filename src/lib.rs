// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod assistant;
pub mod chat;
pub mod config;
pub mod embeddings;
pub mod extraction;
pub mod ingest;
pub mod vector;
pub mod version;
pub mod vision;

pub use assistant::DocumentAssistant;
pub use chat::{ChatConfig, ChatManager, ChatReply, CompletionService, Message, ReplyStatus};
pub use config::NodeConfig;
pub use embeddings::{Embedder, HashEmbedder};
pub use extraction::{DocumentExtractor, DocumentKind, TextExtractor};
pub use ingest::{IngestError, IngestReport, IngestionPipeline, TextSplitter};
pub use vector::{SharedVectorStore, VectorStore, VectorStoreError};
