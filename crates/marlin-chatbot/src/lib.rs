// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-response collaborator boundary.
//!
//! [`ResponderChain`] walks an ordered list of [`ChatResponder`]s, bounding
//! each call with a fixed budget. A provider that errors or stalls falls
//! through to the next; when every provider fails, the chain degrades to a
//! canned textual reply rather than surfacing an error. Chatbot failures are
//! therefore invisible to the router: `respond` is infallible by design.

pub mod client;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use marlin_config::model::ChatbotConfig;
use marlin_core::{ChatContext, ChatReply, ChatResponder, MarlinError};

pub use client::HttpChatResponder;

/// Reply of last resort when every provider failed.
const FALLBACK_TEXT: &str =
    "I could not come up with a reply just now. Please try again in a moment.";

/// Provider id attached to the canned reply.
const FALLBACK_PROVIDER: &str = "fallback";

/// An ordered chain of chat-response providers with per-call budgets.
pub struct ResponderChain {
    responders: Vec<Arc<dyn ChatResponder>>,
    budget: Duration,
}

impl ResponderChain {
    pub fn new(responders: Vec<Arc<dyn ChatResponder>>, budget: Duration) -> Self {
        Self { responders, budget }
    }

    /// Build the chain from configuration: one HTTP responder per endpoint,
    /// tried in listed order.
    pub fn from_config(config: &ChatbotConfig) -> Result<Self, MarlinError> {
        let budget = Duration::from_secs(config.timeout_secs);
        let mut responders: Vec<Arc<dyn ChatResponder>> = Vec::new();
        for endpoint in &config.endpoints {
            responders.push(Arc::new(HttpChatResponder::new(endpoint.clone(), budget)?));
        }
        Ok(Self::new(responders, budget))
    }

    /// Number of configured providers (the canned fallback not included).
    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }

    /// Ask each provider in order; the first reply wins.
    ///
    /// Never fails: a provider error or exceeded budget moves on to the
    /// next provider, and the canned fallback reply closes the chain.
    pub async fn respond(&self, prompt: &str, ctx: &ChatContext) -> ChatReply {
        for responder in &self.responders {
            let id = responder.provider_id().to_string();
            match tokio::time::timeout(self.budget, responder.respond(prompt, ctx)).await {
                Ok(Ok(reply)) => {
                    debug!(provider = id.as_str(), "chat reply generated");
                    return reply;
                }
                Ok(Err(e)) => {
                    warn!(provider = id.as_str(), error = %e, "chat provider failed, trying next");
                }
                Err(_) => {
                    warn!(
                        provider = id.as_str(),
                        budget_ms = self.budget.as_millis() as u64,
                        "chat provider exceeded budget, trying next"
                    );
                }
            }
        }

        ChatReply {
            text: FALLBACK_TEXT.to_string(),
            provider_id: FALLBACK_PROVIDER.to_string(),
        }
    }
}
