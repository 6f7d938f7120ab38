// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented prompt construction

use std::collections::HashSet;

use super::completion::PromptMessage;
use super::session_store::Message;
use crate::vector::SearchHit;

const SYSTEM_TEMPLATE: &str = "You are a helpful assistant answering questions about documents the user uploaded. Use the following excerpts when they are relevant. If the excerpts do not contain the answer, say so.\n\nExcerpts:\n";

/// Join retrieved chunk texts, dropping repeats and keeping first-seen order
///
/// Chunks are compared whole after trimming; blank chunks are skipped.
pub fn build_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty() && seen.insert(*text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Context from search hits, in rank order
pub fn context_from_hits(hits: &[SearchHit]) -> String {
    build_context(hits.iter().map(|hit| hit.text.as_str()))
}

/// System message (only when there is context), prior history, then the new message
pub fn build_prompt(context: &str, history: &[Message], user_message: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if !context.trim().is_empty() {
        messages.push(PromptMessage::system(format!("{}{}", SYSTEM_TEMPLATE, context)));
    }

    messages.extend(history.iter().map(|m| PromptMessage {
        role: m.role.into(),
        content: m.text.clone(),
    }));

    messages.push(PromptMessage::user(user_message));
    messages
}
