// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for one chat-response endpoint.
//!
//! Each endpoint speaks a small JSON contract: the prompt and conversation
//! context go out, `{success, text}` comes back. Anything else (HTTP error,
//! malformed body, `success: false`) is a [`MarlinError::Chatbot`] that the
//! fallback chain turns into a try of the next provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use marlin_core::{ChatContext, ChatReply, ChatResponder, MarlinError};

/// Request body sent to a responder endpoint.
#[derive(Debug, Serialize)]
struct RespondRequest<'a> {
    prompt: &'a str,
    chat_id: &'a str,
    sender_id: &'a str,
    sender_name: &'a str,
    is_group: bool,
}

/// Response body expected from a responder endpoint.
#[derive(Debug, Deserialize)]
struct RespondResponse {
    success: bool,
    #[serde(default)]
    text: String,
}

/// One HTTP-backed chat-response provider.
#[derive(Debug, Clone)]
pub struct HttpChatResponder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatResponder {
    /// Build a client for the endpoint with the given per-call timeout.
    ///
    /// The timeout here is a transport-level bound; the chain applies its
    /// own overall budget on top.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MarlinError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarlinError::Chatbot {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ChatResponder for HttpChatResponder {
    fn provider_id(&self) -> &str {
        &self.endpoint
    }

    async fn respond(&self, prompt: &str, ctx: &ChatContext) -> Result<ChatReply, MarlinError> {
        let body = RespondRequest {
            prompt,
            chat_id: &ctx.chat_id,
            sender_id: &ctx.sender_id,
            sender_name: &ctx.sender_name,
            is_group: ctx.is_group,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| MarlinError::Chatbot {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(endpoint = %self.endpoint, status = %status, "responder answered");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarlinError::Chatbot {
                message: format!("responder returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: RespondResponse =
            response.json().await.map_err(|e| MarlinError::Chatbot {
                message: format!("failed to parse responder body: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !parsed.success || parsed.text.is_empty() {
            return Err(MarlinError::Chatbot {
                message: "responder reported failure".to_string(),
                source: None,
            });
        }

        Ok(ChatReply {
            text: parsed.text,
            provider_id: self.endpoint.clone(),
        })
    }
}
