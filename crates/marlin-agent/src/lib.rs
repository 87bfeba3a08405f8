// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for the Marlin agent.
//!
//! The [`Orchestrator`] composes the lifecycle manager and the event router
//! around one transport: it opens the connection, consumes the connection's
//! event stream, repairs the session under the bounded backoff policy, and
//! tears everything down on cancellation. Events are handled one at a time,
//! so no two events race on shared mutable state; long-latency work inside a
//! handler is the suspension point.

pub mod backoff;
pub mod groups;
pub mod lifecycle;
pub mod router;
pub mod shutdown;
pub mod timers;

use std::sync::Arc;
use std::time::Duration;

use marlin_chatbot::ResponderChain;
use marlin_commands::CommandRegistry;
use marlin_config::MarlinConfig;
use marlin_core::types::{ConnectionStatus, TransportEvent};
use marlin_core::{MarlinError, Transport, TransportConnection};
use marlin_storage::MessageCache;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::groups::GroupCache;
use crate::lifecycle::LifecycleManager;
use crate::router::{EventRouter, RouterSettings};

pub use crate::lifecycle::SessionState;

/// What the connection loop should do after a connection ended.
enum Drive {
    /// The cancellation token fired; stop cleanly.
    Shutdown,
    /// The transport closed retryably; back off and reconnect.
    Reconnect,
}

/// The composed session orchestrator.
pub struct Orchestrator {
    config: MarlinConfig,
    lifecycle: LifecycleManager,
    router: EventRouter,
    cache: Arc<MessageCache>,
}

impl Orchestrator {
    pub fn new(
        config: MarlinConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<MessageCache>,
        registry: Arc<RwLock<CommandRegistry>>,
        chat: Arc<ResponderChain>,
    ) -> Self {
        let lifecycle =
            LifecycleManager::new(transport, &config.transport, config.agent.name.clone());
        let settings = RouterSettings {
            prefix: config.commands.prefix.clone(),
            chatbot_enabled: config.chatbot.enabled,
            footer: config.chatbot.footer.clone(),
            auto_reject_calls: config.transport.auto_reject_calls,
        };
        let router = EventRouter::new(
            Arc::clone(&cache),
            registry,
            chat,
            Arc::new(GroupCache::new()),
            settings,
        );
        Self {
            config,
            lifecycle,
            router,
            cache,
        }
    }

    /// Current lifecycle state, for status reporting.
    pub async fn state(&self) -> SessionState {
        self.lifecycle.state().await
    }

    /// Count of contained per-event failures.
    pub fn event_failures(&self) -> u64 {
        self.router.event_failures()
    }

    /// Run until cancellation or a fatal error.
    ///
    /// Only three errors escape this loop: missing credentials, an
    /// unauthorized close, and an exhausted reconnect budget. Everything
    /// else is contained inside the router or absorbed by the backoff.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MarlinError> {
        let timer_cancel = cancel.child_token();
        let sweeper = timers::spawn_sweeper(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.storage.sweep_interval_secs),
            timer_cancel.clone(),
        );
        let flusher = timers::spawn_flusher(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.storage.flush_interval_secs),
            timer_cancel.clone(),
        );

        let result = self.event_loop(&cancel).await;

        timer_cancel.cancel();
        let _ = sweeper.await;
        let _ = flusher.await;

        if let Err(e) = self.cache.close().await {
            warn!(error = %e, "cache close failed");
        }

        match &result {
            Ok(()) => info!("orchestrator stopped"),
            Err(e) => error!(error = %e, "orchestrator stopped on fatal error"),
        }
        result
    }

    async fn event_loop(&self, cancel: &CancellationToken) -> Result<(), MarlinError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let conn = match self.lifecycle.connect().await {
                Ok(conn) => conn,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "connect attempt failed");
                    self.backoff_sleep(cancel).await?;
                    continue;
                }
            };

            match self.drive_connection(&conn, cancel).await? {
                Drive::Shutdown => return Ok(()),
                Drive::Reconnect => self.backoff_sleep(cancel).await?,
            }
        }
    }

    /// Consume one connection's event stream until it ends.
    async fn drive_connection(
        &self,
        conn: &Arc<dyn TransportConnection>,
        cancel: &CancellationToken,
    ) -> Result<Drive, MarlinError> {
        loop {
            let event = tokio::select! {
                event = conn.next_event() => event,
                _ = cancel.cancelled() => return Ok(Drive::Shutdown),
            };

            match event {
                Ok(TransportEvent::ConnectionUpdate { status }) => match status {
                    ConnectionStatus::Open => self.lifecycle.on_open(conn).await,
                    ConnectionStatus::Connecting => {}
                    ConnectionStatus::Closed(reason) => {
                        self.lifecycle.on_close().await;
                        if reason.is_retryable() {
                            info!(?reason, "transport closed, will reconnect");
                            return Ok(Drive::Reconnect);
                        }
                        self.lifecycle.mark_terminal().await;
                        return Err(MarlinError::Unauthorized);
                    }
                },
                Ok(event) => self.router.handle_event(event, conn).await,
                Err(e) => {
                    warn!(error = %e, "event stream failed, treating as retryable close");
                    self.lifecycle.on_close().await;
                    return Ok(Drive::Reconnect);
                }
            }
        }
    }

    /// Claim a reconnect slot and sleep out its delay, cancellable.
    async fn backoff_sleep(&self, cancel: &CancellationToken) -> Result<(), MarlinError> {
        let delay = self.lifecycle.next_backoff_delay().await?;
        let attempt = self.lifecycle.reconnect_attempts().await;
        info!(attempt, delay_ms = delay.as_millis() as u64, "backing off before reconnect");
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => Ok(()),
        }
    }
}
