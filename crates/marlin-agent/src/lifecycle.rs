// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle state machine.
//!
//! States: `disconnected` -> `connecting` -> `connected` -> `disconnected`
//! (on a retryable close, followed by `connecting` again) or
//! `terminal-invalid` (absorbing, on a logged-out close).
//!
//! All transitions are serialized through one mutex on the [`Session`];
//! only one connect attempt is in flight at any time, and a connect request
//! issued while already connecting or connected is a no-op returning the
//! live handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use marlin_config::model::TransportConfig;
use marlin_core::types::OutboundMessage;
use marlin_core::{MarlinError, Transport, TransportConnection};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backoff::BackoffPolicy;

/// Delay before the post-connect self-announcement is sent.
const ANNOUNCE_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle states of the transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection; the initial state.
    Disconnected,
    /// A connect attempt is in flight or the handshake is running.
    Connecting,
    /// The session is established and events flow.
    Connected,
    /// The transport invalidated the credentials; absorbing.
    TerminalInvalid,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::TerminalInvalid => write!(f, "terminal-invalid"),
        }
    }
}

/// Process-wide session state, mutated only by the [`LifecycleManager`].
pub struct Session {
    pub state: SessionState,
    pub reconnect_attempts: u32,
    /// The authenticated account's phone-equivalent identifier.
    pub identity: Option<String>,
    pub connection: Option<Arc<dyn TransportConnection>>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            reconnect_attempts: 0,
            identity: None,
            connection: None,
        }
    }
}

/// Owns the session state machine and the reconnect policy.
pub struct LifecycleManager {
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    policy: BackoffPolicy,
    credentials_path: PathBuf,
    owner_id: Option<String>,
    agent_name: String,
    announce_delay: Duration,
}

impl LifecycleManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &TransportConfig,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session: Mutex::new(Session::new()),
            policy: BackoffPolicy {
                base: Duration::from_millis(config.reconnect_base_ms),
                cap: Duration::from_millis(config.reconnect_cap_ms),
                max_attempts: config.max_reconnect_attempts,
            },
            credentials_path: PathBuf::from(&config.credentials_path),
            owner_id: config.owner_id.clone(),
            agent_name: agent_name.into(),
            announce_delay: ANNOUNCE_DELAY,
        }
    }

    /// Shrink the self-announcement delay; test-only knob.
    pub fn with_announce_delay(mut self, delay: Duration) -> Self {
        self.announce_delay = delay;
        self
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    pub async fn reconnect_attempts(&self) -> u32 {
        self.session.lock().await.reconnect_attempts
    }

    pub async fn identity(&self) -> Option<String> {
        self.session.lock().await.identity.clone()
    }

    /// Open a connection, or return the live handle when one exists.
    ///
    /// Fails fast with [`MarlinError::MissingCredentials`] when the durable
    /// credential artifact is absent; this is a startup precondition, not a
    /// retryable error. A terminal-invalid session refuses to connect.
    pub async fn connect(&self) -> Result<Arc<dyn TransportConnection>, MarlinError> {
        {
            let mut session = self.session.lock().await;
            match session.state {
                SessionState::Connecting | SessionState::Connected => {
                    return match &session.connection {
                        Some(conn) => Ok(Arc::clone(conn)),
                        None => Err(MarlinError::Internal(
                            "connect already in flight".to_string(),
                        )),
                    };
                }
                SessionState::TerminalInvalid => return Err(MarlinError::Unauthorized),
                SessionState::Disconnected => {}
            }

            if !self.credentials_path.exists() {
                return Err(MarlinError::MissingCredentials {
                    path: self.credentials_path.display().to_string(),
                });
            }

            session.state = SessionState::Connecting;
        }

        match self.transport.connect().await {
            Ok(conn) => {
                let mut session = self.session.lock().await;
                session.connection = Some(Arc::clone(&conn));
                info!("transport connect issued, waiting for open");
                Ok(conn)
            }
            Err(e) => {
                let mut session = self.session.lock().await;
                session.state = SessionState::Disconnected;
                session.connection = None;
                Err(e)
            }
        }
    }

    /// Handle the transport's open signal: reset the attempt counter,
    /// capture identity, and schedule the one-shot self-announcement.
    pub async fn on_open(&self, conn: &Arc<dyn TransportConnection>) {
        {
            let mut session = self.session.lock().await;
            if session.state == SessionState::Connected {
                // Duplicate open on the same connection; announce only once.
                return;
            }
            session.state = SessionState::Connected;
            session.reconnect_attempts = 0;
            session.identity = conn.identity();
            info!(
                identity = session.identity.as_deref().unwrap_or("unknown"),
                "transport session open"
            );
        }
        self.schedule_announcement(conn);
    }

    /// Handle a close: drop the handle and fall back to `disconnected`.
    pub async fn on_close(&self) {
        let mut session = self.session.lock().await;
        session.state = SessionState::Disconnected;
        session.connection = None;
    }

    /// Absorbing transition on a logged-out close.
    pub async fn mark_terminal(&self) {
        let mut session = self.session.lock().await;
        session.state = SessionState::TerminalInvalid;
        session.connection = None;
        warn!("session marked terminal-invalid; re-authentication required");
    }

    /// Claim the next reconnect slot and return its backoff delay.
    ///
    /// Errors with [`MarlinError::ReconnectExhausted`] once the configured
    /// attempt bound is reached.
    pub async fn next_backoff_delay(&self) -> Result<Duration, MarlinError> {
        let mut session = self.session.lock().await;
        let attempt = session.reconnect_attempts;
        if attempt >= self.policy.max_attempts {
            return Err(MarlinError::ReconnectExhausted { attempts: attempt });
        }
        session.reconnect_attempts += 1;
        Ok(self.policy.delay(attempt))
    }

    /// Best-effort one-shot announcement to the owner, after a short delay.
    /// Failure never affects connection state.
    fn schedule_announcement(&self, conn: &Arc<dyn TransportConnection>) {
        let Some(owner) = self.owner_id.clone() else {
            return;
        };
        let conn = Arc::clone(conn);
        let delay = self.announce_delay;
        let text = format!("{} is online and listening", self.agent_name);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = conn.send(OutboundMessage::text(owner, text)).await {
                warn!(error = %e, "self-announcement failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_test_utils::{MockConnection, MockTransport};

    fn transport_config(dir: &tempfile::TempDir) -> TransportConfig {
        let creds = dir.path().join("creds.json");
        std::fs::write(&creds, "{}").unwrap();
        TransportConfig {
            credentials_path: creds.to_str().unwrap().to_string(),
            owner_id: Some("owner@s.whatsapp.net".to_string()),
            reconnect_base_ms: 10,
            reconnect_cap_ms: 40,
            max_reconnect_attempts: 3,
            auto_reject_calls: false,
        }
    }

    async fn manager_with_connection(
        dir: &tempfile::TempDir,
    ) -> (LifecycleManager, Arc<MockConnection>) {
        let transport = Arc::new(MockTransport::new());
        let conn = MockConnection::new();
        transport.push_connection(Arc::clone(&conn)).await;
        let manager = LifecycleManager::new(transport, &transport_config(dir), "marlin")
            .with_announce_delay(Duration::from_millis(1));
        (manager, conn)
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;
        assert_eq!(manager.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn missing_credentials_fail_fast() {
        let transport = Arc::new(MockTransport::new());
        let config = TransportConfig {
            credentials_path: "/nonexistent/creds.json".to_string(),
            ..TransportConfig::default()
        };
        let manager = LifecycleManager::new(transport.clone(), &config, "marlin");

        let err = match manager.connect().await {
            Ok(_) => panic!("expected a missing-credentials error"),
            Err(e) => e,
        };
        assert!(matches!(err, MarlinError::MissingCredentials { .. }));
        // Fail-fast: no connection attempt was made.
        assert_eq!(transport.connect_count(), 0);
        assert_eq!(manager.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_then_open_resets_attempts_and_captures_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, conn) = manager_with_connection(&dir).await;

        let handle = manager.connect().await.unwrap();
        assert_eq!(manager.state().await, SessionState::Connecting);

        manager.on_open(&handle).await;
        assert_eq!(manager.state().await, SessionState::Connected);
        assert_eq!(manager.reconnect_attempts().await, 0);
        assert_eq!(
            manager.identity().await.as_deref(),
            Some("15550009999@s.whatsapp.net")
        );

        // The deferred self-announcement reaches the owner.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = conn.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "owner@s.whatsapp.net");
        assert!(sent[0].text.contains("online"));
    }

    #[tokio::test]
    async fn duplicate_open_announces_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, conn) = manager_with_connection(&dir).await;

        let handle = manager.connect().await.unwrap();
        manager.on_open(&handle).await;
        manager.on_open(&handle).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(conn.sent_count().await, 1);
    }

    #[tokio::test]
    async fn connect_while_connected_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;

        let first = manager.connect().await.unwrap();
        manager.on_open(&first).await;
        let second = manager.connect().await.unwrap();

        // Same handle, no second transport connect.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn backoff_delays_follow_formula_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;

        // base 10ms, cap 40ms, max 3 attempts.
        assert_eq!(
            manager.next_backoff_delay().await.unwrap(),
            Duration::from_millis(10)
        );
        assert_eq!(
            manager.next_backoff_delay().await.unwrap(),
            Duration::from_millis(20)
        );
        assert_eq!(
            manager.next_backoff_delay().await.unwrap(),
            Duration::from_millis(40)
        );

        let err = manager.next_backoff_delay().await.unwrap_err();
        assert!(matches!(err, MarlinError::ReconnectExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn open_resets_the_attempt_counter() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;

        manager.next_backoff_delay().await.unwrap();
        manager.next_backoff_delay().await.unwrap();
        assert_eq!(manager.reconnect_attempts().await, 2);

        let handle = manager.connect().await.unwrap();
        manager.on_open(&handle).await;
        assert_eq!(manager.reconnect_attempts().await, 0);
    }

    #[tokio::test]
    async fn terminal_state_refuses_further_connects() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;

        manager.mark_terminal().await;
        assert_eq!(manager.state().await, SessionState::TerminalInvalid);

        let err = match manager.connect().await {
            Ok(_) => panic!("expected an unauthorized error"),
            Err(e) => e,
        };
        assert!(matches!(err, MarlinError::Unauthorized));
    }

    #[tokio::test]
    async fn close_returns_to_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _conn) = manager_with_connection(&dir).await;

        let handle = manager.connect().await.unwrap();
        manager.on_open(&handle).await;
        manager.on_close().await;
        assert_eq!(manager.state().await, SessionState::Disconnected);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
        assert_eq!(SessionState::Connected.to_string(), "connected");
        assert_eq!(SessionState::TerminalInvalid.to_string(), "terminal-invalid");
    }
}
