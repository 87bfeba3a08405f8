// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marlin serve` command implementation.
//!
//! Wires the full agent: SQLite message cache, command registry with the
//! built-in catalog, chat-response chain, bridge transport, and the session
//! orchestrator under a signal-driven cancellation token.

use std::sync::Arc;

use marlin_agent::{shutdown, Orchestrator};
use marlin_chatbot::ResponderChain;
use marlin_commands::{builtin::builtin_sources, CommandRegistry};
use marlin_config::MarlinConfig;
use marlin_core::{MarlinError, Transport};
use marlin_storage::MessageCache;
use marlin_transport_bridge::BridgeTransport;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the agent with the transport resolved from configuration.
pub async fn run_from_config(config: MarlinConfig) -> Result<(), MarlinError> {
    let transport: Arc<dyn Transport> = Arc::new(BridgeTransport::new(config.bridge.clone())?);
    let cancel = shutdown::install_signal_handler();
    run(config, transport, cancel).await
}

/// Run the agent against an explicit transport until cancellation or a
/// fatal error.
pub async fn run(
    config: MarlinConfig,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) -> Result<(), MarlinError> {
    let cache = Arc::new(MessageCache::new(config.storage.clone()));
    cache.initialize().await?;

    let registry = Arc::new(RwLock::new(CommandRegistry::new(
        config.commands.prefix.clone(),
    )));
    let sources = builtin_sources(&registry, Arc::clone(&cache));
    let count = registry.write().await.load(sources);
    info!(commands = count, prefix = %config.commands.prefix, "command registry ready");

    let chat = Arc::new(ResponderChain::from_config(&config.chatbot)?);
    if config.chatbot.enabled && chat.is_empty() {
        warn!("no chatbot endpoints configured; automated replies degrade to the canned fallback");
    }

    let orchestrator = Orchestrator::new(config, transport, cache, registry, chat);
    orchestrator.run(cancel).await
}
