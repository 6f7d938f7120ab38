// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use docqa_node::{
    api::{start_server, AppState},
    chat::{ChatConfig, ChatManager, OpenRouterClient},
    config::{EmbeddingBackend, NodeConfig},
    embeddings::{Embedder, HashEmbedder, OnnxEmbeddingModel},
    extraction::DocumentExtractor,
    ingest::{IngestionPipeline, TextSplitter},
    vector::VectorStore,
    vision::{OcrEngine, VlmOcrClient},
    DocumentAssistant,
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = NodeConfig::parse();
    config.validate().context("Invalid configuration")?;

    info!("Starting {}", docqa_node::version::get_version_string());
    info!("Build: {}", docqa_node::version::VERSION);

    let timeout = config.collaborator_timeout();

    let embedder: Arc<dyn Embedder> = match config.embedding_backend {
        EmbeddingBackend::Onnx => {
            let model = OnnxEmbeddingModel::new(
                "all-MiniLM-L6-v2",
                &config.embedding_model_path,
                &config.embedding_tokenizer_path,
            )
            .await
            .context("Failed to load ONNX embedding model (set EMBEDDING_BACKEND=hash to run without it)")?;
            Arc::new(model)
        }
        EmbeddingBackend::Hash => {
            warn!("Using hash embeddings; retrieval quality is for testing only");
            Arc::new(HashEmbedder::new(config.embedding_dimension)?)
        }
    };
    info!(
        "Embeddings: {} ({} dimensions)",
        embedder.model_name(),
        embedder.dimension()
    );

    let ocr: Option<Arc<dyn OcrEngine>> = match config.ocr_model.as_deref() {
        Some(model) if !model.trim().is_empty() => {
            let client = VlmOcrClient::new(
                config.ocr_endpoint(),
                model,
                config.openrouter_api_key.clone(),
                timeout,
            )?;
            Some(Arc::new(client) as Arc<dyn OcrEngine>)
        }
        _ => {
            warn!("OCR_MODEL not set: image uploads are disabled, PDFs use their text layer only");
            None
        }
    };

    if config.openrouter_api_key.is_none() {
        warn!("OPENROUTER_API_KEY not set; chat replies will report an auth failure");
    }
    let completion = Arc::new(OpenRouterClient::new(
        &config.openrouter_base_url,
        config.openrouter_api_key.clone(),
        timeout,
    )?);

    let store = VectorStore::with_dimension(embedder.dimension()).shared();

    let pipeline = IngestionPipeline::new(
        Arc::new(DocumentExtractor::new(ocr)),
        embedder.clone(),
        store.clone(),
        TextSplitter::new(config.chunk_size, config.chunk_overlap)?,
        timeout,
    );

    let chat = ChatManager::new(
        store,
        Some(embedder),
        completion,
        ChatConfig {
            top_k: config.retrieval_top_k,
            timeout,
            default_model: config.default_model.clone(),
        },
    );

    let assistant = Arc::new(DocumentAssistant::new(pipeline, chat));
    let state = AppState::new(assistant, config.max_upload_bytes);

    start_server(state, config.bind_addr()?).await?;

    info!("Node stopped");
    Ok(())
}
