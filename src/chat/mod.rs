// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session chat over retrieved document context

pub mod completion;
pub mod manager;
pub mod prompt;
pub mod session_store;
pub(crate) mod wire;

pub use completion::{
    CompletionError, CompletionService, FailureReason, OpenRouterClient, PromptMessage, PromptRole,
};
pub use manager::{ChatConfig, ChatManager, ChatReply, CompletionFailure, ReplyStatus};
pub use session_store::{Message, Role, SessionStore};
