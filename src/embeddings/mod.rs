// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding collaborators
//!
//! The chat manager and the ingestion pipeline only see the [`Embedder`]
//! trait. Two implementations ship with the node:
//! - [`OnnxEmbeddingModel`] - all-MiniLM-L6-v2 through ONNX Runtime
//! - [`HashEmbedder`] - deterministic bag-of-words hashing, no model files

pub mod onnx_model;

pub use onnx_model::OnnxEmbeddingModel;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Embedding service contract
///
/// Implementations must be deterministic for identical input and return
/// vectors of the same dimension for every call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier used in logs and health output
    fn model_name(&self) -> &str;

    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input in the same order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Deterministic hashing embedder
///
/// Every lowercase word is hashed to a seed that drives a small LCG, and the
/// per-word vectors are summed and L2-normalised. Texts that share words end
/// up close together, which is enough for offline runs and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }
        Ok(Self { dimension })
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let mut current_seed = hasher.finish();

            for (i, slot) in embedding.iter_mut().enumerate() {
                current_seed =
                    (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
                // Map to [-1, 1]
                let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
                *slot += value as f32;
            }
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
