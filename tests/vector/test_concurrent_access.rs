// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Concurrent batch inserts and queries through the shared store handle

use docqa_node::vector::{ChunkMetadata, ChunkRecord, VectorStore};
use std::collections::HashSet;

fn document(doc: usize, chunks: usize) -> Vec<ChunkRecord> {
    (0..chunks)
        .map(|i| ChunkRecord {
            id: format!("doc{}:{}", doc, i),
            vector: vec![doc as f32, i as f32, 1.0],
            metadata: ChunkMetadata {
                text: format!("document {} chunk {}", doc, i),
                source_name: format!("doc{}.pdf", doc),
                chunk_index: i,
            },
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_whole_documents_only() {
    const DOCS: usize = 16;
    const CHUNKS: usize = 8;
    let store = VectorStore::new().shared();

    let mut tasks = Vec::new();
    for doc in 0..DOCS {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let mut guard = store.write().await;
            guard.add_batch(document(doc, CHUNKS)).unwrap();
        }));
    }
    for _ in 0..DOCS {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let guard = store.read().await;
            // Every document is either fully present or absent
            assert_eq!(guard.len() % CHUNKS, 0);
            let hits = guard.query(&[0.0, 0.0, 1.0], DOCS * CHUNKS).unwrap();
            assert_eq!(hits.len(), guard.len());
        }));
    }

    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    let guard = store.read().await;
    assert_eq!(guard.len(), DOCS * CHUNKS);
    let ids: HashSet<String> = guard
        .query(&[0.0, 0.0, 1.0], DOCS * CHUNKS)
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(ids.len(), DOCS * CHUNKS);
}
