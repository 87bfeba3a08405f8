// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable command traits.
//!
//! A [`CommandSource`] resolves to a batch of [`Command`]s ahead of registry
//! load; the registry consumes a caller-supplied list of sources rather than
//! scanning the filesystem, which makes the last-registered-wins conflict
//! policy explicit and testable.

use std::sync::Arc;

use async_trait::async_trait;
use strum::{Display, EnumString};

use crate::error::MarlinError;
use crate::traits::transport::TransportConnection;
use crate::types::TransportMessage;

/// Fixed command categories, in help-menu display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CommandCategory {
    General,
    Group,
    Admin,
    Owner,
}

impl CommandCategory {
    /// Display order used by the help menu.
    pub const DISPLAY_ORDER: [CommandCategory; 4] = [
        CommandCategory::General,
        CommandCategory::Group,
        CommandCategory::Admin,
        CommandCategory::Owner,
    ];

    /// Section heading shown in the help menu.
    pub fn heading(&self) -> &'static str {
        match self {
            CommandCategory::General => "General",
            CommandCategory::Group => "Group",
            CommandCategory::Admin => "Admin",
            CommandCategory::Owner => "Owner",
        }
    }
}

/// Static metadata describing one invocable command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Unique name; lookups are case-insensitive.
    pub name: String,
    pub description: String,
    /// Usage hint, e.g. `"kick <participant>"`.
    pub usage: String,
    pub category: CommandCategory,
}

/// Ephemeral invocation context, built per dispatch and never persisted.
#[derive(Clone)]
pub struct CommandContext {
    /// The originating message.
    pub message: TransportMessage,
    pub chat_id: String,
    pub sender_id: String,
    /// Positional arguments, post-prefix tokenized.
    pub args: Vec<String>,
    pub is_group: bool,
    /// Back-reference for issuing side-effecting transport calls.
    pub connection: Arc<dyn TransportConnection>,
}

/// One invocable command.
#[async_trait]
pub trait Command: Send + Sync {
    fn spec(&self) -> CommandSpec;

    /// Runs the command. A returned error is caught by the dispatcher and
    /// surfaced as a structured failure outcome.
    async fn execute(&self, ctx: &CommandContext) -> Result<String, MarlinError>;
}

/// A resolvable batch of commands.
///
/// Sources may fail to load; the registry logs and skips a failing source
/// without aborting the overall load.
pub trait CommandSource: Send + Sync {
    /// Source name, used in load-failure log lines.
    fn name(&self) -> &str;

    fn load(&self) -> Result<Vec<Arc<dyn Command>>, MarlinError>;
}
