// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-response collaborator trait.

use async_trait::async_trait;

use crate::error::MarlinError;

/// Conversation context passed along with each prompt.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub is_group: bool,
}

/// A generated reply, tagged with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub provider_id: String,
}

/// An external service that turns a prompt plus context into reply text.
///
/// Implementations are expected to be HTTP-backed and may fail or stall;
/// callers bound each call with a fixed budget and walk a fallback chain on
/// failure.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Stable identifier for logging and reply attribution.
    fn provider_id(&self) -> &str;

    /// Generates a reply for the prompt.
    async fn respond(&self, prompt: &str, ctx: &ChatContext) -> Result<ChatReply, MarlinError>;
}
