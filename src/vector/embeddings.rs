// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Distance functions used by retrieval

/// Squared Euclidean distance between two equal-length slices.
///
/// This is the score reported by the vector store: it orders identically
/// to the true distance and skips the sqrt. Mismatched lengths yield
/// `f32::INFINITY`; callers are expected to have validated dimensions.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// True when every component is a finite number
pub fn is_finite_vector(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}
