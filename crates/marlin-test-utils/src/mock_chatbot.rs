// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat responder for deterministic testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use marlin_core::{ChatContext, ChatReply, ChatResponder, MarlinError};

/// A scripted responder.
///
/// Serves queued replies in order; can be configured to fail every call or
/// to stall long enough to trip a caller's budget.
pub struct MockResponder {
    id: String,
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockResponder {
    pub fn new(id: impl Into<String>, replies: Vec<String>) -> Self {
        Self {
            id: id.into(),
            replies: Mutex::new(replies.into()),
            fail: false,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A responder whose every call fails.
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            replies: Mutex::new(VecDeque::new()),
            fail: true,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A responder that sleeps before answering.
    pub fn slow(id: impl Into<String>, reply: &str, delay: Duration) -> Self {
        Self {
            id: id.into(),
            replies: Mutex::new(VecDeque::from([reply.to_string()])),
            fail: false,
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts this responder has been asked.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl ChatResponder for MockResponder {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn respond(&self, prompt: &str, _ctx: &ChatContext) -> Result<ChatReply, MarlinError> {
        self.prompts.lock().await.push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(MarlinError::Chatbot {
                message: format!("{} is scripted to fail", self.id),
                source: None,
            });
        }

        let reply = self.replies.lock().await.pop_front().ok_or_else(|| {
            MarlinError::Chatbot {
                message: format!("{} ran out of scripted replies", self.id),
                source: None,
            }
        })?;

        Ok(ChatReply {
            text: reply,
            provider_id: self.id.clone(),
        })
    }
}
