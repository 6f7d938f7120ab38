// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Concurrent turns across sessions must not leak or interleave

use async_trait::async_trait;
use docqa_node::chat::{
    ChatConfig, ChatManager, CompletionError, CompletionService, PromptMessage, Role,
};
use docqa_node::vector::VectorStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Sleeps briefly so turns overlap, then answers with the user message
struct JitterCompletion;

#[async_trait]
impl CompletionService for JitterCompletion {
    async fn complete(
        &self,
        _model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let delay = (last.len() % 7) as u64 * 3;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(format!("re: {}", last))
    }
}

/// Holds any turn whose message is "slow" until released
struct GatedCompletion {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionService for GatedCompletion {
    async fn complete(
        &self,
        _model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last == "slow" {
            self.started.notify_one();
            self.release.notified().await;
        }
        Ok(format!("re: {}", last))
    }
}

fn manager() -> Arc<ChatManager> {
    Arc::new(ChatManager::new(
        VectorStore::new().shared(),
        None,
        Arc::new(JitterCompletion),
        ChatConfig::default(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_sessions_never_share_messages() {
    let chat = manager();
    const TURNS: usize = 20;

    let mut tasks = Vec::new();
    for session in ["s1", "s2"] {
        let chat = chat.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..TURNS {
                chat.handle_message(session, &format!("{}-msg-{}", session, i), "")
                    .await;
            }
        }));
    }
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    for session in ["s1", "s2"] {
        let history = chat.history(session).await;
        assert_eq!(history.len(), TURNS * 2);
        for (i, pair) in history.chunks(2).enumerate() {
            let expected = format!("{}-msg-{}", session, i);
            assert_eq!(pair[0].text, expected);
            assert_eq!(pair[1].text, format!("re: {}", expected));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_in_one_session_stay_paired() {
    let chat = manager();
    const TURNS: usize = 30;

    let tasks: Vec<_> = (0..TURNS)
        .map(|i| {
            let chat = chat.clone();
            tokio::spawn(async move {
                chat.handle_message("shared", &format!("q{}", i), "").await;
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    let history = chat.history("shared").await;
    assert_eq!(history.len(), TURNS * 2);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].text, format!("re: {}", pair[0].text));
    }
}

#[tokio::test]
async fn test_many_sessions_are_tracked() {
    let chat = manager();
    for i in 0..5 {
        chat.handle_message(&format!("session-{}", i), "hi", "").await;
    }
    assert_eq!(chat.sessions().session_count().await, 5);
    assert!(chat.history("session-9").await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_turn_does_not_block_other_sessions() {
    let gate = Arc::new(GatedCompletion {
        started: Notify::new(),
        release: Notify::new(),
    });
    let chat = Arc::new(ChatManager::new(
        VectorStore::new().shared(),
        None,
        gate.clone(),
        ChatConfig::default(),
    ));

    let slow = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.handle_message("a", "slow", "").await })
    };
    gate.started.notified().await;

    let quick = Duration::from_secs(1);
    let reply = tokio::time::timeout(quick, chat.handle_message("b", "fast", ""))
        .await
        .expect("session b waited on session a");
    assert!(reply.is_completed());

    let pending = tokio::time::timeout(quick, chat.history("a"))
        .await
        .expect("history read waited on an in-flight turn");
    assert!(pending.is_empty());
    assert_eq!(chat.history("b").await.len(), 2);

    gate.release.notify_one();
    let reply = slow.await.unwrap();
    assert_eq!(reply.text, "re: slow");
    assert_eq!(chat.history("a").await.len(), 2);
}
