// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the in-memory vector store

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorStoreError {
    /// Vector length differs from the store's fixed dimensionality
    #[error("Dimension mismatch: store holds {expected}D vectors, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A chunk with this id is already indexed
    #[error("Duplicate chunk id: {0}")]
    DuplicateId(String),

    #[error("Vector contains NaN or Infinity values")]
    NonFiniteValue,

    #[error("Vector is empty")]
    EmptyVector,
}

impl VectorStoreError {
    /// Get error code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            VectorStoreError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            VectorStoreError::DuplicateId(_) => "DUPLICATE_ID",
            VectorStoreError::NonFiniteValue => "NON_FINITE_VALUE",
            VectorStoreError::EmptyVector => "EMPTY_VECTOR",
        }
    }
}
