// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embeddings;
pub mod errors;
pub mod store;

pub use embeddings::squared_euclidean;
pub use errors::VectorStoreError;
pub use store::{ChunkMetadata, ChunkRecord, SearchHit, SharedVectorStore, VectorStore};
