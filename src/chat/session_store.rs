// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-session conversation history
//!
//! The outer map is write-locked only to create a missing session. Each
//! session has its own mutex, so turns in different sessions never contend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

type History = Arc<Mutex<Vec<Message>>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, History>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn session(&self, session_id: &str) -> History {
        if let Some(history) = self.sessions.read().await.get(session_id) {
            return history.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// Append a user message and its reply as one contiguous pair
    pub async fn append_turn(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        let history = self.session(session_id).await;
        let mut messages = history.lock().await;
        messages.push(Message::user(user_text));
        messages.push(Message::assistant(assistant_text));
    }

    /// Snapshot of a session's history; empty for an unknown session
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let history = match self.sessions.read().await.get(session_id) {
            Some(history) => history.clone(),
            None => return Vec::new(),
        };
        let messages = history.lock().await;
        messages.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
