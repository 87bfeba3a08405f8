// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch with per-event failure isolation.
//!
//! Each transport event is routed to exactly one handler keyed by kind.
//! Within a message batch, every message runs in its own failure boundary:
//! an error is logged and counted, and the batch continues with the next
//! message. A failure in one event-kind handler never reaches another.
//!
//! Live message classification, in order: cache write, revocation recovery,
//! command dispatch for prefixed text, automated chat reply for everything
//! else. Historical backfill batches are skipped entirely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use marlin_chatbot::ResponderChain;
use marlin_commands::{execute_command, CommandOutcome, CommandRegistry, Resolution};
use marlin_core::content;
use marlin_core::traits::command::CommandContext;
use marlin_core::types::{
    is_group_chat, BatchKind, CallEvent, GroupAction, OutboundMessage, SettingScope,
    TransportEvent, TransportMessage,
};
use marlin_core::{ChatContext, MarlinError, TransportConnection};
use marlin_storage::MessageCache;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::groups::GroupCache;

/// Router behavior knobs, resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Command prefix, e.g. `!`.
    pub prefix: String,
    /// Master chatbot switch; per-scope toggles narrow it further.
    pub chatbot_enabled: bool,
    /// Footer appended to every automated reply.
    pub footer: String,
    /// Reject incoming call offers.
    pub auto_reject_calls: bool,
}

/// Demultiplexes transport events into cache writes, command dispatches,
/// and chat replies.
pub struct EventRouter {
    cache: Arc<MessageCache>,
    registry: Arc<RwLock<CommandRegistry>>,
    chat: Arc<ResponderChain>,
    groups: Arc<GroupCache>,
    settings: RouterSettings,
    event_failures: AtomicU64,
}

impl EventRouter {
    pub fn new(
        cache: Arc<MessageCache>,
        registry: Arc<RwLock<CommandRegistry>>,
        chat: Arc<ResponderChain>,
        groups: Arc<GroupCache>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            cache,
            registry,
            chat,
            groups,
            settings,
            event_failures: AtomicU64::new(0),
        }
    }

    /// Count of contained per-event failures since startup.
    pub fn event_failures(&self) -> u64 {
        self.event_failures.load(Ordering::Relaxed)
    }

    /// Route one event. Never propagates: every handler failure is logged
    /// and counted here.
    pub async fn handle_event(
        &self,
        event: TransportEvent,
        conn: &Arc<dyn TransportConnection>,
    ) {
        match event {
            TransportEvent::MessageBatch { messages, kind } => {
                self.handle_message_batch(messages, kind, conn).await;
            }
            TransportEvent::GroupMetadataChanged { metadata } => {
                self.groups.update(metadata).await;
            }
            TransportEvent::GroupParticipantsChanged {
                group_id,
                participants,
                action,
            } => {
                if let Err(e) = self
                    .handle_participants_changed(&group_id, &participants, action, conn)
                    .await
                {
                    self.note_failure();
                    warn!(group = %group_id, error = %e, "group membership handling failed");
                }
            }
            TransportEvent::CallReceived { call } => {
                if let Err(e) = self.handle_call(&call, conn).await {
                    self.note_failure();
                    warn!(call_id = %call.call_id, error = %e, "call handling failed");
                }
            }
            TransportEvent::ReactionReceived { reaction } => {
                debug!(
                    chat = %reaction.chat_id,
                    message = %reaction.message_id,
                    emoji = %reaction.emoji,
                    "reaction received"
                );
            }
            TransportEvent::PresenceChanged { presence } => {
                debug!(chat = %presence.chat_id, presence = %presence.presence, "presence changed");
            }
            TransportEvent::ChatMetadataChanged { update } => {
                debug!(chat = %update.chat_id, "chat metadata changed");
            }
            // Connection status is the lifecycle manager's concern; it is
            // consumed before events reach the router.
            TransportEvent::ConnectionUpdate { .. } => {}
        }
    }

    async fn handle_message_batch(
        &self,
        messages: Vec<TransportMessage>,
        kind: BatchKind,
        conn: &Arc<dyn TransportConnection>,
    ) {
        if kind != BatchKind::Notify {
            debug!(count = messages.len(), "skipping historical backfill batch");
            return;
        }

        for msg in &messages {
            if let Err(e) = self.handle_message(msg, conn).await {
                self.note_failure();
                warn!(
                    message_id = %msg.id,
                    chat = %msg.chat_id,
                    error = %e,
                    "message handling failed, continuing batch"
                );
            }
        }
    }

    /// Cache write, then classification, strictly sequential for one message.
    async fn handle_message(
        &self,
        msg: &TransportMessage,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        self.cache.add_message(msg).await?;

        let Some(payload) = &msg.payload else {
            return Ok(());
        };

        if let Some(target) = content::revoked_target(payload) {
            return self.handle_revocation(&target, &msg.chat_id, conn).await;
        }

        let text = content::extract_text(payload);
        if text.is_empty() {
            return Ok(());
        }

        if let Some(input) = text.strip_prefix(&self.settings.prefix) {
            return self.dispatch_command(input, msg, conn).await;
        }

        self.maybe_chat_reply(&text, msg, conn).await
    }

    async fn dispatch_command(
        &self,
        input: &str,
        msg: &TransportMessage,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        // Resolve under the read lock, execute outside it: a command such as
        // `reload` takes the write lock.
        let resolution = self.registry.read().await.resolve(input);
        let outcome = match resolution {
            Resolution::Unknown { message } => CommandOutcome {
                success: false,
                message,
            },
            Resolution::Known { command, args } => {
                let ctx = CommandContext {
                    message: msg.clone(),
                    chat_id: msg.chat_id.clone(),
                    sender_id: msg.sender_id.clone(),
                    args: Vec::new(),
                    is_group: is_group_chat(&msg.chat_id),
                    connection: Arc::clone(conn),
                };
                execute_command(&command, ctx, args).await
            }
        };

        conn.send(OutboundMessage {
            chat_id: msg.chat_id.clone(),
            text: outcome.message,
            quote: Some(msg.id.clone()),
        })
        .await?;
        Ok(())
    }

    /// Recovery flow for a revocation marker.
    ///
    /// The cached original is deliberately NOT deleted: it stays queryable
    /// until the age sweep expires it. A successful lookup is counted and
    /// the last-known content is re-posted to the chat.
    async fn handle_revocation(
        &self,
        target_id: &str,
        chat_id: &str,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        match self.cache.get_message(target_id, Some(chat_id)).await? {
            Some(original) => {
                self.cache.note_recovery().await?;
                info!(message_id = target_id, chat = chat_id, "revoked message recovered");

                let body = if original.text.is_empty() {
                    format!(
                        "{} revoked a {} message; the original is retained.",
                        original.sender_name, original.kind
                    )
                } else {
                    format!(
                        "{} revoked a message. Original content:\n{}",
                        original.sender_name, original.text
                    )
                };
                conn.send(OutboundMessage::text(chat_id, body)).await?;
            }
            None => {
                debug!(message_id = target_id, "revoked message was not cached");
            }
        }
        Ok(())
    }

    async fn maybe_chat_reply(
        &self,
        text: &str,
        msg: &TransportMessage,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        if msg.from_self || !self.settings.chatbot_enabled {
            return Ok(());
        }

        // Group and user toggles are ANDed; both default to enabled.
        let is_group = is_group_chat(&msg.chat_id);
        let group_ok = if is_group {
            self.cache
                .chatbot_enabled(SettingScope::Group, &msg.chat_id)
                .await?
        } else {
            true
        };
        if !group_ok {
            return Ok(());
        }
        let user_ok = self
            .cache
            .chatbot_enabled(SettingScope::User, &msg.sender_id)
            .await?;
        if !user_ok {
            return Ok(());
        }

        let ctx = ChatContext {
            chat_id: msg.chat_id.clone(),
            sender_id: msg.sender_id.clone(),
            sender_name: msg.sender_name.clone(),
            is_group,
        };
        let reply = self.chat.respond(text, &ctx).await;

        conn.send(OutboundMessage {
            chat_id: msg.chat_id.clone(),
            text: format!("{}\n\n{}", reply.text, self.settings.footer),
            quote: Some(msg.id.clone()),
        })
        .await?;
        Ok(())
    }

    async fn handle_participants_changed(
        &self,
        group_id: &str,
        participants: &[String],
        action: GroupAction,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        self.groups
            .apply_participants(group_id, participants, action)
            .await;

        // First sighting of this group: pull full metadata once.
        if self.groups.get(group_id).await.is_none() {
            let metadata = conn.fetch_group_metadata(group_id).await?;
            self.groups.update(metadata).await;
        }
        Ok(())
    }

    async fn handle_call(
        &self,
        call: &CallEvent,
        conn: &Arc<dyn TransportConnection>,
    ) -> Result<(), MarlinError> {
        if self.settings.auto_reject_calls {
            conn.reject_call(&call.call_id, &call.from).await?;
            info!(from = %call.from, "incoming call rejected");
        } else {
            debug!(from = %call.from, "incoming call ignored");
        }
        Ok(())
    }

    fn note_failure(&self) {
        self.event_failures.fetch_add(1, Ordering::Relaxed);
    }
}
