// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport collaborator traits.
//!
//! The transport is the external protocol client that owns the wire
//! connection. Each successful [`Transport::connect`] yields a fresh
//! [`TransportConnection`] handle; the orchestrator consumes that handle's
//! event stream until the transport signals a close, then discards it and
//! asks for a new one. Event subscription therefore happens exactly once
//! per connection lifetime.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MarlinError;
use crate::types::{
    GroupAction, GroupMetadata, MessageId, OutboundMessage, TransportEvent,
};

/// Factory for transport connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes a session against the messaging platform.
    ///
    /// Returns a fresh connection handle. The handle starts in the
    /// handshake phase; the `Open` connection-status event on its stream
    /// marks the session as established.
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>, MarlinError>;
}

/// One live (or in-handshake) session against the transport.
#[async_trait]
pub trait TransportConnection: Send + Sync {
    /// The authenticated account's phone-equivalent identifier, once known.
    fn identity(&self) -> Option<String>;

    /// Waits for the next event on this connection's stream.
    async fn next_event(&self) -> Result<TransportEvent, MarlinError>;

    /// Sends a message into a chat.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MarlinError>;

    /// Fetches current metadata for a group chat.
    async fn fetch_group_metadata(&self, group_id: &str) -> Result<GroupMetadata, MarlinError>;

    /// Applies a membership operation to a group's participant list.
    async fn update_group_participants(
        &self,
        group_id: &str,
        participant_ids: &[String],
        action: GroupAction,
    ) -> Result<(), MarlinError>;

    /// Rejects an incoming call offer.
    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), MarlinError>;

    /// Fetches the invite code for a group chat.
    async fn fetch_invite_code(&self, group_id: &str) -> Result<String, MarlinError>;
}
