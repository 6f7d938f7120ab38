// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion: extract, split, embed, index
//!
//! Collaborator calls (OCR, embedding) run without holding the store lock.
//! Once every chunk is embedded, the whole document is inserted under a
//! single write-lock acquisition, so readers see all of it or none of it.

pub mod splitter;

pub use splitter::{SplitterError, TextSplitter};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::extraction::{DocumentKind, ExtractionError, TextExtractor};
use crate::vector::{ChunkMetadata, ChunkRecord, SharedVectorStore, VectorStoreError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Upload is empty")]
    EmptyUpload,

    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Extraction succeeded but yielded nothing worth indexing
    #[error("No text found in {source_name}")]
    NoText { source_name: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding timed out after {0:?}")]
    EmbeddingTimeout(Duration),

    #[error("Embedder returned {actual} vectors for {expected} chunks")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("Vector store rejected the document: {0}")]
    Store(#[from] VectorStoreError),
}

impl IngestError {
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::EmptyUpload => "EMPTY_UPLOAD",
            IngestError::UnsupportedDocument(_) => "UNSUPPORTED_DOCUMENT",
            IngestError::Extraction(e) => e.error_code(),
            IngestError::NoText { .. } => "NO_TEXT",
            IngestError::Embedding(_) => "EMBEDDING_FAILED",
            IngestError::EmbeddingTimeout(_) => "EMBEDDING_TIMEOUT",
            IngestError::EmbeddingCountMismatch { .. } => "EMBEDDING_COUNT_MISMATCH",
            IngestError::Store(e) => e.error_code(),
        }
    }
}

/// Outcome of indexing one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub document_id: String,
    pub source_name: String,
    pub chunks_indexed: usize,
    pub characters_extracted: usize,
}

/// Extracted text shown to the caller before (or instead of) indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub source_name: String,
    pub mime_type: String,
    pub text: String,
}

pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    store: SharedVectorStore,
    splitter: TextSplitter,
    timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        store: SharedVectorStore,
        splitter: TextSplitter,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            embedder,
            store,
            splitter,
            timeout,
        }
    }

    pub fn store(&self) -> &SharedVectorStore {
        &self.store
    }

    /// Extract text without touching the index
    pub async fn extract_only(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<ExtractedDocument, IngestError> {
        let kind = resolve_kind(bytes, filename)?;
        let text = self.extract_text(bytes, kind).await?;
        Ok(ExtractedDocument {
            source_name: filename.to_string(),
            mime_type: kind.mime_type().to_string(),
            text,
        })
    }

    /// Extract, split, embed and index one document
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<IngestReport, IngestError> {
        let start = std::time::Instant::now();
        let kind = resolve_kind(bytes, filename)?;
        let text = self.extract_text(bytes, kind).await?;

        if text.trim().is_empty() {
            warn!("No text extracted from {}, nothing indexed", filename);
            return Err(IngestError::NoText {
                source_name: filename.to_string(),
            });
        }

        let chunks = self.splitter.split(&text);
        debug!("{} split into {} chunks", filename, chunks.len());

        let vectors = self.embed_chunks(&chunks).await?;
        let document_id = Uuid::new_v4().to_string();

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (text, vector))| ChunkRecord {
                id: format!("{}:{}", document_id, chunk_index),
                vector,
                metadata: ChunkMetadata {
                    text,
                    source_name: filename.to_string(),
                    chunk_index,
                },
            })
            .collect();

        let chunks_indexed = {
            let mut store = self.store.write().await;
            store.add_batch(records)?
        };

        info!(
            "Indexed {} ({} chunks, {} chars) as {} in {}ms",
            filename,
            chunks_indexed,
            text.chars().count(),
            document_id,
            start.elapsed().as_millis()
        );

        Ok(IngestReport {
            document_id,
            source_name: filename.to_string(),
            chunks_indexed,
            characters_extracted: text.chars().count(),
        })
    }

    async fn extract_text(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, IngestError> {
        match tokio::time::timeout(self.timeout, self.extractor.extract(bytes, kind)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ExtractionError::Timeout(self.timeout).into()),
        }
    }

    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let vectors = tokio::time::timeout(self.timeout, self.embedder.embed(chunks))
            .await
            .map_err(|_| IngestError::EmbeddingTimeout(self.timeout))?
            .map_err(|e| IngestError::Embedding(e.to_string()))?;

        if vectors.len() != chunks.len() {
            return Err(IngestError::EmbeddingCountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

fn resolve_kind(bytes: &[u8], filename: &str) -> Result<DocumentKind, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyUpload);
    }
    DocumentKind::resolve(filename, bytes)
        .ok_or_else(|| IngestError::UnsupportedDocument(filename.to_string()))
}
