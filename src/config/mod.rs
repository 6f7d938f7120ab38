// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Every option can come from the command line or the environment (a `.env`
//! file is loaded first by the binary).

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::chat::completion::DEFAULT_OPENROUTER_BASE_URL;
use crate::chat::manager::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_K};
use crate::ingest::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 through ONNX Runtime
    Onnx,
    /// Deterministic hashing embedder, no model files needed
    Hash,
}

/// DocQA node - document question answering over OCR'd uploads
#[derive(Parser, Debug, Clone)]
#[command(name = "docqa-node")]
#[command(version)]
#[command(about = "Upload documents, index them, and chat about them", long_about = None)]
pub struct NodeConfig {
    /// Address to bind the HTTP API on
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    pub api_host: String,

    #[arg(long, env = "API_PORT", default_value_t = 8080)]
    pub api_port: u16,

    /// OpenRouter (or other OpenAI-compatible) API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = DEFAULT_OPENROUTER_BASE_URL)]
    pub openrouter_base_url: String,

    /// Model used when a chat request does not name one
    #[arg(long, env = "DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub default_model: String,

    #[arg(long, env = "EMBEDDING_BACKEND", value_enum, default_value_t = EmbeddingBackend::Onnx)]
    pub embedding_backend: EmbeddingBackend,

    #[arg(
        long,
        env = "EMBEDDING_MODEL_PATH",
        default_value = "./models/all-MiniLM-L6-v2-onnx/model.onnx"
    )]
    pub embedding_model_path: PathBuf,

    #[arg(
        long,
        env = "EMBEDDING_TOKENIZER_PATH",
        default_value = "./models/all-MiniLM-L6-v2-onnx/tokenizer.json"
    )]
    pub embedding_tokenizer_path: PathBuf,

    /// Vector size for the hash backend (the ONNX backend reports its own)
    #[arg(long, env = "EMBEDDING_DIMENSION", default_value_t = 384)]
    pub embedding_dimension: usize,

    /// Vision model endpoint for OCR; defaults to the OpenRouter base URL
    #[arg(long, env = "OCR_ENDPOINT")]
    pub ocr_endpoint: Option<String>,

    /// Vision model used for OCR; OCR is disabled when unset
    #[arg(long, env = "OCR_MODEL")]
    pub ocr_model: Option<String>,

    /// Maximum characters per chunk
    #[arg(long, env = "CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    #[arg(long, env = "RETRIEVAL_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub retrieval_top_k: usize,

    /// Upper bound for each OCR, embedding or completion call
    #[arg(long, env = "COLLABORATOR_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub collaborator_timeout_secs: u64,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl NodeConfig {
    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow!("CHUNK_SIZE must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(anyhow!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }
        if self.retrieval_top_k == 0 {
            return Err(anyhow!("RETRIEVAL_TOP_K must be greater than 0"));
        }
        if self.collaborator_timeout_secs == 0 {
            return Err(anyhow!("COLLABORATOR_TIMEOUT_SECS must be greater than 0"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than 0"));
        }
        if self.embedding_backend == EmbeddingBackend::Hash && self.embedding_dimension == 0 {
            return Err(anyhow!("EMBEDDING_DIMENSION must be greater than 0"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .map_err(|e| anyhow!("Invalid API_HOST/API_PORT: {}", e))
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// OCR endpoint, falling back to the completion base URL
    pub fn ocr_endpoint(&self) -> &str {
        self.ocr_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.openrouter_base_url)
    }
}
