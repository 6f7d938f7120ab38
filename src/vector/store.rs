// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-memory exact nearest-neighbour index over document chunks
// Lives for the process lifetime; nothing is persisted or evicted

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::embeddings::{is_finite_vector, squared_euclidean};
use super::errors::VectorStoreError;

/// Shared handle used by ingestion (writer) and chat turns (readers)
pub type SharedVectorStore = Arc<RwLock<VectorStore>>;

/// Metadata kept alongside each vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub text: String,
    pub source_name: String,
    pub chunk_index: usize,
}

/// A stored chunk. Immutable once added.
#[derive(Clone, Debug)]
pub struct ChunkRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One query result; lower score means closer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub source_name: String,
    pub chunk_index: usize,
}

/// Flat vector index
/// - Dimensionality is fixed by the first insert (or at construction)
/// - Search is a brute-force scan under squared Euclidean distance
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    dimension: Option<usize>,
    records: Vec<ChunkRecord>,
    positions: HashMap<String, usize>,
}

impl VectorStore {
    /// Create an empty store whose dimension is taken from the first vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that only accepts `dimension`-length vectors
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedVectorStore {
        Arc::new(RwLock::new(self))
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ChunkRecord> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    /// Add a chunk vector
    ///
    /// # Returns
    /// * `Ok(())` if added
    /// * `Err(DimensionMismatch)` if the length differs from the store's dimension
    /// * `Err(DuplicateId)` if `id` is already indexed
    /// * `Err(NonFiniteValue | EmptyVector)` for unusable vectors
    pub fn add(
        &mut self,
        id: String,
        vector: Vec<f32>,
        metadata: ChunkMetadata,
    ) -> Result<(), VectorStoreError> {
        self.validate(&id, &vector)?;

        if self.dimension.is_none() {
            self.dimension = Some(vector.len());
        }
        self.positions.insert(id.clone(), self.records.len());
        self.records.push(ChunkRecord {
            id,
            vector,
            metadata,
        });

        Ok(())
    }

    /// Add several chunks all-or-nothing
    ///
    /// Every record is validated (against the store and against each other)
    /// before the first one is inserted.
    pub fn add_batch(&mut self, records: Vec<ChunkRecord>) -> Result<usize, VectorStoreError> {
        let mut dimension = self.dimension;
        let mut seen = std::collections::HashSet::new();

        for record in &records {
            check_vector(&record.vector)?;
            let expected = *dimension.get_or_insert(record.vector.len());
            if record.vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: record.vector.len(),
                });
            }
            if self.contains(&record.id) || !seen.insert(record.id.as_str()) {
                return Err(VectorStoreError::DuplicateId(record.id.clone()));
            }
        }

        drop(seen);

        let count = records.len();
        for record in records {
            self.add(record.id, record.vector, record.metadata)?;
        }
        Ok(count)
    }

    /// Find the `top_k` nearest chunks
    ///
    /// Results are ordered by ascending squared Euclidean distance; equal
    /// scores keep insertion order. An empty store returns no hits for any
    /// query.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, VectorStoreError> {
        if self.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, record)| (pos, squared_euclidean(vector, &record.vector)))
            .collect();

        // Stable sort keeps insertion order for ties
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| {
                let record = &self.records[pos];
                SearchHit {
                    id: record.id.clone(),
                    score,
                    text: record.metadata.text.clone(),
                    source_name: record.metadata.source_name.clone(),
                    chunk_index: record.metadata.chunk_index,
                }
            })
            .collect())
    }

    fn validate(&self, id: &str, vector: &[f32]) -> Result<(), VectorStoreError> {
        check_vector(vector)?;

        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        if self.contains(id) {
            return Err(VectorStoreError::DuplicateId(id.to_string()));
        }

        Ok(())
    }
}

fn check_vector(vector: &[f32]) -> Result<(), VectorStoreError> {
    if vector.is_empty() {
        return Err(VectorStoreError::EmptyVector);
    }
    if !is_finite_vector(vector) {
        return Err(VectorStoreError::NonFiniteValue);
    }
    Ok(())
}
