// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Ingestion end to end with stub OCR and hash embeddings

use async_trait::async_trait;
use docqa_node::embeddings::{Embedder, HashEmbedder};
use docqa_node::extraction::{DocumentExtractor, DocumentKind, ExtractionError, TextExtractor};
use docqa_node::ingest::{IngestError, IngestionPipeline, TextSplitter};
use docqa_node::vector::VectorStore;
use docqa_node::vision::OcrEngine;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

struct StubOcr(&'static str);

#[async_trait]
impl OcrEngine for StubOcr {
    fn name(&self) -> &str {
        "stub"
    }

    async fn recognize(&self, _image_bytes: &[u8]) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct HangingExtractor;

#[async_trait]
impl TextExtractor for HangingExtractor {
    async fn extract(&self, _bytes: &[u8], _kind: DocumentKind) -> Result<String, ExtractionError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("never".to_string())
    }
}

/// Returns one vector fewer than asked for
struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    fn model_name(&self) -> &str {
        "short"
    }

    fn dimension(&self) -> usize {
        2
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }
}

fn tiny_png() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn pipeline_with(
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
) -> (IngestionPipeline, docqa_node::vector::SharedVectorStore) {
    let store = VectorStore::new().shared();
    let pipeline = IngestionPipeline::new(
        extractor,
        embedder,
        store.clone(),
        TextSplitter::new(60, 15).unwrap(),
        timeout,
    );
    (pipeline, store)
}

#[tokio::test]
async fn test_image_upload_is_ocrd_and_indexed() {
    let text = "ACME Corp receipt. Coffee 3.50. Bagel 2.25. Total 5.75. Paid by card.";
    let (pipeline, store) = pipeline_with(
        Arc::new(DocumentExtractor::new(Some(Arc::new(StubOcr(text))))),
        Arc::new(HashEmbedder::new(32).unwrap()),
        Duration::from_secs(5),
    );

    let report = pipeline.ingest(&tiny_png(), "receipt.png").await.unwrap();
    assert!(report.chunks_indexed >= 2);
    assert_eq!(report.characters_extracted, text.len());

    let guard = store.read().await;
    assert_eq!(guard.len(), report.chunks_indexed);
    for i in 0..report.chunks_indexed {
        let record = guard.get(&format!("{}:{}", report.document_id, i)).unwrap();
        assert_eq!(record.metadata.chunk_index, i);
        assert_eq!(record.metadata.source_name, "receipt.png");
        assert!(record.metadata.text.chars().count() <= 60);
    }
}

#[tokio::test]
async fn test_blank_ocr_result_is_no_text() {
    let (pipeline, store) = pipeline_with(
        Arc::new(DocumentExtractor::new(Some(Arc::new(StubOcr("   \n  "))))),
        Arc::new(HashEmbedder::new(32).unwrap()),
        Duration::from_secs(5),
    );

    let result = pipeline.ingest(&tiny_png(), "blank.png").await;
    assert!(matches!(result, Err(IngestError::NoText { .. })));
    assert!(store.read().await.is_empty());
}

#[tokio::test]
async fn test_image_without_ocr_backend() {
    let (pipeline, _store) = pipeline_with(
        Arc::new(DocumentExtractor::new(None)),
        Arc::new(HashEmbedder::new(32).unwrap()),
        Duration::from_secs(5),
    );
    let result = pipeline.ingest(&tiny_png(), "scan.png").await;
    assert!(matches!(
        result,
        Err(IngestError::Extraction(ExtractionError::OcrUnavailable))
    ));
}

#[tokio::test]
async fn test_extraction_timeout() {
    let (pipeline, _store) = pipeline_with(
        Arc::new(HangingExtractor),
        Arc::new(HashEmbedder::new(32).unwrap()),
        Duration::from_millis(50),
    );
    let result = pipeline.ingest(b"%PDF-1.4", "slow.pdf").await;
    assert!(matches!(
        result,
        Err(IngestError::Extraction(ExtractionError::Timeout(_)))
    ));
}

#[tokio::test]
async fn test_embedding_count_mismatch_indexes_nothing() {
    let (pipeline, store) = pipeline_with(
        Arc::new(DocumentExtractor::new(Some(Arc::new(StubOcr("some words on a page"))))),
        Arc::new(ShortEmbedder),
        Duration::from_secs(5),
    );
    let result = pipeline.ingest(&tiny_png(), "page.png").await;
    assert!(matches!(
        result,
        Err(IngestError::EmbeddingCountMismatch {
            expected: 1,
            actual: 0
        })
    ));
    assert!(store.read().await.is_empty());
}

#[tokio::test]
async fn test_two_documents_get_distinct_ids() {
    let (pipeline, store) = pipeline_with(
        Arc::new(DocumentExtractor::new(Some(Arc::new(StubOcr("invoice text"))))),
        Arc::new(HashEmbedder::new(32).unwrap()),
        Duration::from_secs(5),
    );
    let first = pipeline.ingest(&tiny_png(), "a.png").await.unwrap();
    let second = pipeline.ingest(&tiny_png(), "a.png").await.unwrap();

    assert_ne!(first.document_id, second.document_id);
    assert_eq!(store.read().await.len(), 2);
}
