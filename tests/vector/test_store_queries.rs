// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Nearest-neighbour queries against the in-memory vector store

use docqa_node::vector::{ChunkMetadata, ChunkRecord, VectorStore, VectorStoreError};

fn meta(text: &str, index: usize) -> ChunkMetadata {
    ChunkMetadata {
        text: text.to_string(),
        source_name: "scan.pdf".to_string(),
        chunk_index: index,
    }
}

#[test]
fn test_closer_vector_wins() {
    let mut store = VectorStore::new();
    store
        .add("A".to_string(), vec![1.0, 0.0, 0.0, 0.0], meta("alpha", 0))
        .unwrap();
    store
        .add("B".to_string(), vec![0.0, 1.0, 0.0, 0.0], meta("beta", 1))
        .unwrap();

    let hits = store.query(&[0.9, 0.1, 0.0, 0.0], 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "A");
    assert_eq!(hits[0].text, "alpha");
    assert!((hits[0].score - 0.02).abs() < 1e-6);
}

#[test]
fn test_results_ascending_and_bounded() {
    let mut store = VectorStore::new();
    for i in 0..10 {
        store
            .add(format!("c{}", i), vec![i as f32, 0.0], meta("x", i))
            .unwrap();
    }

    let hits = store.query(&[3.2, 0.0], 4).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["c3", "c4", "c2", "c5"]);
    assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
}

#[test]
fn test_fewer_chunks_than_top_k() {
    let mut store = VectorStore::new();
    store.add("only".to_string(), vec![1.0, 1.0], meta("x", 0)).unwrap();
    assert_eq!(store.query(&[0.0, 0.0], 10).unwrap().len(), 1);
}

#[test]
fn test_empty_store_returns_nothing() {
    let store = VectorStore::new();
    assert!(store.query(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());

    let sized = VectorStore::with_dimension(4);
    assert!(sized.query(&[1.0], 5).unwrap().is_empty());
}

#[test]
fn test_mismatched_add_leaves_store_unchanged() {
    let mut store = VectorStore::new();
    store.add("a".to_string(), vec![0.0; 4], meta("a", 0)).unwrap();

    let err = store
        .add("b".to_string(), vec![0.0; 3], meta("b", 1))
        .unwrap_err();
    assert_eq!(
        err,
        VectorStoreError::DimensionMismatch {
            expected: 4,
            actual: 3
        }
    );
    assert_eq!(store.len(), 1);
    assert!(!store.contains("b"));
    assert_eq!(store.dimension(), Some(4));
}

#[test]
fn test_mismatched_query_is_error() {
    let mut store = VectorStore::new();
    store.add("a".to_string(), vec![0.0; 4], meta("a", 0)).unwrap();
    assert!(matches!(
        store.query(&[0.0; 5], 1),
        Err(VectorStoreError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_duplicate_id_rejected() {
    let mut store = VectorStore::new();
    store.add("a".to_string(), vec![1.0, 0.0], meta("first", 0)).unwrap();
    let err = store
        .add("a".to_string(), vec![0.0, 1.0], meta("second", 0))
        .unwrap_err();
    assert_eq!(err, VectorStoreError::DuplicateId("a".to_string()));
    assert_eq!(store.get("a").unwrap().metadata.text, "first");
}

#[test]
fn test_batch_is_all_or_nothing() {
    let mut store = VectorStore::new();
    let records = vec![
        ChunkRecord {
            id: "d:0".to_string(),
            vector: vec![1.0, 0.0],
            metadata: meta("ok", 0),
        },
        ChunkRecord {
            id: "d:1".to_string(),
            vector: vec![f32::NAN, 0.0],
            metadata: meta("bad", 1),
        },
    ];
    assert_eq!(store.add_batch(records), Err(VectorStoreError::NonFiniteValue));
    assert!(store.is_empty());
    assert_eq!(store.dimension(), None);
}
