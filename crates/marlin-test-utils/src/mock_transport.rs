// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` yields scripted `MockConnection`s in order, one per
//! `connect()` call, so reconnect sequences can be exercised. Each
//! connection serves injected events from a queue and captures every
//! side-effecting call for assertion.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use marlin_core::types::{
    GroupAction, GroupMetadata, MessageId, OutboundMessage, TransportEvent,
};
use marlin_core::{MarlinError, Transport, TransportConnection};

/// A scripted transport: each `connect()` pops the next prepared connection.
pub struct MockTransport {
    connections: Mutex<VecDeque<Arc<MockConnection>>>,
    connect_count: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(VecDeque::new()),
            connect_count: AtomicUsize::new(0),
        }
    }

    /// Queue a connection to be returned by the next `connect()`.
    pub async fn push_connection(&self, conn: Arc<MockConnection>) {
        self.connections.lock().await.push_back(conn);
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>, MarlinError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let conn = self.connections.lock().await.pop_front();
        match conn {
            Some(conn) => Ok(conn),
            None => Err(MarlinError::Transport {
                message: "no scripted connection left".to_string(),
                source: None,
            }),
        }
    }
}

/// One scripted connection.
///
/// Events injected via [`push_event`] are served in order by `next_event`;
/// when the queue runs dry, `next_event` waits until another event arrives.
/// All imperative calls are captured.
///
/// [`push_event`]: MockConnection::push_event
pub struct MockConnection {
    identity: Option<String>,
    events: Mutex<VecDeque<TransportEvent>>,
    notify: Notify,
    sent: Mutex<Vec<OutboundMessage>>,
    group_metadata: Mutex<HashMap<String, GroupMetadata>>,
    invite_codes: Mutex<HashMap<String, String>>,
    participant_updates: Mutex<Vec<(String, Vec<String>, GroupAction)>>,
    rejected_calls: Mutex<Vec<(String, String)>>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Self::with_identity(Some("15550009999@s.whatsapp.net".to_string()))
    }

    pub fn with_identity(identity: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            identity,
            events: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            sent: Mutex::new(Vec::new()),
            group_metadata: Mutex::new(HashMap::new()),
            invite_codes: Mutex::new(HashMap::new()),
            participant_updates: Mutex::new(Vec::new()),
            rejected_calls: Mutex::new(Vec::new()),
        })
    }

    /// Inject an event into the stream.
    pub async fn push_event(&self, event: TransportEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// All messages sent through this connection.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Prepare a `fetch_group_metadata` answer.
    pub async fn set_group_metadata(&self, metadata: GroupMetadata) {
        self.group_metadata
            .lock()
            .await
            .insert(metadata.id.clone(), metadata);
    }

    /// Prepare a `fetch_invite_code` answer.
    pub async fn set_invite_code(&self, group_id: &str, code: &str) {
        self.invite_codes
            .lock()
            .await
            .insert(group_id.to_string(), code.to_string());
    }

    /// Captured `update_group_participants` calls.
    pub async fn participant_updates(&self) -> Vec<(String, Vec<String>, GroupAction)> {
        self.participant_updates.lock().await.clone()
    }

    /// Captured `reject_call` calls.
    pub async fn rejected_calls(&self) -> Vec<(String, String)> {
        self.rejected_calls.lock().await.clone()
    }
}

#[async_trait]
impl TransportConnection for MockConnection {
    fn identity(&self) -> Option<String> {
        self.identity.clone()
    }

    async fn next_event(&self) -> Result<TransportEvent, MarlinError> {
        loop {
            {
                let mut queue = self.events.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MarlinError> {
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }

    async fn fetch_group_metadata(&self, group_id: &str) -> Result<GroupMetadata, MarlinError> {
        self.group_metadata
            .lock()
            .await
            .get(group_id)
            .cloned()
            .ok_or_else(|| MarlinError::Transport {
                message: format!("no metadata scripted for {group_id}"),
                source: None,
            })
    }

    async fn update_group_participants(
        &self,
        group_id: &str,
        participant_ids: &[String],
        action: GroupAction,
    ) -> Result<(), MarlinError> {
        self.participant_updates.lock().await.push((
            group_id.to_string(),
            participant_ids.to_vec(),
            action,
        ));
        Ok(())
    }

    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), MarlinError> {
        self.rejected_calls
            .lock()
            .await
            .push((call_id.to_string(), from.to_string()));
        Ok(())
    }

    async fn fetch_invite_code(&self, group_id: &str) -> Result<String, MarlinError> {
        self.invite_codes
            .lock()
            .await
            .get(group_id)
            .cloned()
            .ok_or_else(|| MarlinError::Transport {
                message: format!("no invite code scripted for {group_id}"),
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_core::types::{BatchKind, ConnectionStatus};

    #[tokio::test]
    async fn connect_pops_scripted_connections_in_order() {
        let transport = MockTransport::new();
        let first = MockConnection::with_identity(Some("a".into()));
        let second = MockConnection::with_identity(Some("b".into()));
        transport.push_connection(first).await;
        transport.push_connection(second).await;

        let c1 = transport.connect().await.unwrap();
        let c2 = transport.connect().await.unwrap();
        assert_eq!(c1.identity().as_deref(), Some("a"));
        assert_eq!(c2.identity().as_deref(), Some("b"));
        assert_eq!(transport.connect_count(), 2);

        assert!(transport.connect().await.is_err());
    }

    #[tokio::test]
    async fn events_are_served_in_order() {
        let conn = MockConnection::new();
        conn.push_event(TransportEvent::ConnectionUpdate {
            status: ConnectionStatus::Open,
        })
        .await;
        conn.push_event(TransportEvent::MessageBatch {
            messages: vec![],
            kind: BatchKind::Notify,
        })
        .await;

        assert!(matches!(
            conn.next_event().await.unwrap(),
            TransportEvent::ConnectionUpdate { .. }
        ));
        assert!(matches!(
            conn.next_event().await.unwrap(),
            TransportEvent::MessageBatch { .. }
        ));
    }

    #[tokio::test]
    async fn next_event_waits_for_injection() {
        let conn = MockConnection::new();
        let conn_clone = Arc::clone(&conn);

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            conn_clone
                .push_event(TransportEvent::ConnectionUpdate {
                    status: ConnectionStatus::Open,
                })
                .await;
        });

        let event = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            conn.next_event(),
        )
        .await
        .expect("next_event timed out")
        .unwrap();
        assert!(matches!(event, TransportEvent::ConnectionUpdate { .. }));
    }

    #[tokio::test]
    async fn send_and_admin_calls_are_captured() {
        let conn = MockConnection::new();

        conn.send(OutboundMessage::text("chat@g.us", "hello"))
            .await
            .unwrap();
        conn.update_group_participants("chat@g.us", &["x".into()], GroupAction::Promote)
            .await
            .unwrap();
        conn.reject_call("call-1", "caller").await.unwrap();

        assert_eq!(conn.sent_count().await, 1);
        assert_eq!(conn.participant_updates().await.len(), 1);
        assert_eq!(conn.rejected_calls().await, vec![("call-1".into(), "caller".into())]);
    }
}
