// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the collaborator traits and the orchestrator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a delivered message, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// The lifecycle status the transport reports for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// The handshake is in progress.
    Connecting,
    /// The session is established and events will flow.
    Open,
    /// The session closed with the given reason.
    Closed(CloseReason),
}

/// Why the transport closed the session.
///
/// [`LoggedOut`] is the one non-retryable reason: the account's credentials
/// were invalidated and reconnecting would loop forever. Every other close
/// reason feeds the bounded backoff.
///
/// [`LoggedOut`]: CloseReason::LoggedOut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The transport invalidated the session credentials.
    LoggedOut,
    /// Any other close, carrying the transport's status code.
    Other(u16),
}

impl CloseReason {
    /// True when the lifecycle manager may schedule a reconnect.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CloseReason::LoggedOut)
    }
}

/// Distinguishes live incoming traffic from backfilled history replay.
///
/// Only live traffic participates in caching and command/chat routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Notify,
    History,
}

/// One message record as delivered by the transport, before ingestion.
///
/// The payload is the transport's full serialized message object, kept
/// opaque; the content-derivation rules in [`crate::content`] are the only
/// code that looks inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMessage {
    /// Message id, unique within a chat.
    pub id: String,
    /// The chat (direct or group) the message belongs to.
    pub chat_id: String,
    /// Sender identifier.
    pub sender_id: String,
    /// Sender display name, as pushed by the transport.
    pub sender_name: String,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    /// True when the message originated from the bot's own account.
    pub from_self: bool,
    /// Full serialized original payload; `None` for key-only stubs.
    pub payload: Option<serde_json::Value>,
}

/// Classified kind of a cached message, derived from its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    #[default]
    Unknown,
}

/// One observed message as stored in the cache.
///
/// `(id, chat_id)` is the natural key; a later write with the same key
/// replaces the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub timestamp_ms: i64,
    pub kind: MessageKind,
    /// Extracted plain-text content; empty when none of the derivation
    /// rules matched.
    pub text: String,
    pub view_once: bool,
    /// The original opaque payload, round-tripped for recovery/replay.
    pub payload: serde_json::Value,
}

/// Point-in-time aggregates over the message cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_messages: i64,
    pub distinct_chats: i64,
    pub view_once_messages: i64,
}

/// Durable counters maintained alongside the cache rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    /// Total messages ever cached, overwrites included.
    pub total_cached: i64,
    /// How often a revoked message was successfully looked up afterwards.
    pub recovered_after_revoke: i64,
    /// Epoch milliseconds of the last sweep run, if any.
    pub last_sweep_ms: Option<i64>,
}

/// An outbound message to be sent through the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub text: String,
    /// Message id to quote, when replying in-thread.
    pub quote: Option<String>,
}

impl OutboundMessage {
    /// Plain text message to a chat, no quote.
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            quote: None,
        }
    }
}

/// Membership operation applied to a group's participant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupAction {
    Add,
    Remove,
    Promote,
    Demote,
}

/// One member of a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParticipant {
    pub id: String,
    pub is_admin: bool,
}

/// Metadata the transport exposes for a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: String,
    pub subject: String,
    pub owner: Option<String>,
    pub participants: Vec<GroupParticipant>,
}

/// An incoming voice/video call offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub call_id: String,
    pub from: String,
}

/// A reaction applied to an earlier message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub emoji: String,
}

/// A presence change (typing, online, ...) in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub chat_id: String,
    pub sender_id: String,
    pub presence: String,
}

/// A chat-level metadata change (archive state, unread count, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUpdate {
    pub chat_id: String,
    pub archived: Option<bool>,
    pub unread_count: Option<u32>,
}

/// Every event kind the transport can emit.
///
/// The router dispatches each event to exactly one handler keyed by variant;
/// events are immutable once received. The serialized form is tagged by
/// `type`, which is also the wire shape bridge transports deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    ConnectionUpdate {
        status: ConnectionStatus,
    },
    MessageBatch {
        messages: Vec<TransportMessage>,
        kind: BatchKind,
    },
    GroupMetadataChanged {
        metadata: GroupMetadata,
    },
    GroupParticipantsChanged {
        group_id: String,
        participants: Vec<String>,
        action: GroupAction,
    },
    ReactionReceived {
        reaction: Reaction,
    },
    CallReceived {
        call: CallEvent,
    },
    PresenceChanged {
        presence: PresenceUpdate,
    },
    ChatMetadataChanged {
        update: ChatUpdate,
    },
}

/// Scope of a durable chatbot toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SettingScope {
    User,
    Group,
}

/// Heuristic for group chats: the transport suffixes group chat ids with
/// `@g.us`, direct chats with `@s.whatsapp.net`.
pub fn is_group_chat(chat_id: &str) -> bool {
    chat_id.ends_with("@g.us")
}
