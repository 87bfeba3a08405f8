// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in command catalog.
//!
//! Commands are grouped into category-named [`StaticSource`]s mirroring the
//! help-menu categories. [`builtin_sources`] wires them against the shared
//! registry and cache handles; deployments can append their own sources to
//! the returned list before loading.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use marlin_core::traits::command::{
    Command, CommandCategory, CommandContext, CommandSource, CommandSpec,
};
use marlin_core::types::{GroupAction, SettingScope};
use marlin_core::MarlinError;
use marlin_storage::MessageCache;
use tokio::sync::RwLock;

use crate::registry::CommandRegistry;

/// A source backed by a fixed list of commands.
pub struct StaticSource {
    name: String,
    commands: Vec<Arc<dyn Command>>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, commands: Vec<Arc<dyn Command>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            commands,
        })
    }
}

impl CommandSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<Arc<dyn Command>>, MarlinError> {
        Ok(self.commands.clone())
    }
}

/// The full built-in catalog as category-named sources.
pub fn builtin_sources(
    registry: &Arc<RwLock<CommandRegistry>>,
    cache: Arc<MessageCache>,
) -> Vec<Arc<dyn CommandSource>> {
    let registry = Arc::downgrade(registry);
    vec![
        StaticSource::new(
            "general",
            vec![
                Arc::new(PingCommand),
                Arc::new(MenuCommand {
                    registry: registry.clone(),
                }),
                Arc::new(StatsCommand {
                    cache: cache.clone(),
                }),
            ],
        ),
        StaticSource::new(
            "group",
            vec![Arc::new(GroupInfoCommand), Arc::new(InviteCommand)],
        ),
        StaticSource::new(
            "admin",
            vec![
                Arc::new(ParticipantCommand::promote()),
                Arc::new(ParticipantCommand::demote()),
                Arc::new(ParticipantCommand::kick()),
                Arc::new(ChatbotToggleCommand { cache }),
            ],
        ),
        StaticSource::new("owner", vec![Arc::new(ReloadCommand { registry })]),
    ]
}

fn failure(name: &str, message: impl Into<String>) -> MarlinError {
    MarlinError::CommandFailed {
        name: name.to_string(),
        message: message.into(),
    }
}

fn require_group(ctx: &CommandContext, name: &str) -> Result<(), MarlinError> {
    if ctx.is_group {
        Ok(())
    } else {
        Err(failure(name, "this command only works in group chats"))
    }
}

/// Liveness check.
pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "ping".into(),
            description: "Check that the bot is alive".into(),
            usage: "ping".into(),
            category: CommandCategory::General,
        }
    }

    async fn execute(&self, _ctx: &CommandContext) -> Result<String, MarlinError> {
        Ok("pong".to_string())
    }
}

/// Renders the categorized help menu.
pub struct MenuCommand {
    registry: Weak<RwLock<CommandRegistry>>,
}

#[async_trait]
impl Command for MenuCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "menu".into(),
            description: "List available commands".into(),
            usage: "menu".into(),
            category: CommandCategory::General,
        }
    }

    async fn execute(&self, _ctx: &CommandContext) -> Result<String, MarlinError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| failure("menu", "registry is gone"))?;
        let menu = registry.read().await.help_menu();
        Ok(menu)
    }
}

/// Message cache statistics.
pub struct StatsCommand {
    cache: Arc<MessageCache>,
}

#[async_trait]
impl Command for StatsCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "stats".into(),
            description: "Show message cache statistics".into(),
            usage: "stats".into(),
            category: CommandCategory::General,
        }
    }

    async fn execute(&self, _ctx: &CommandContext) -> Result<String, MarlinError> {
        let stats = self.cache.stats().await?;
        let counters = self.cache.counters().await?;
        Ok(format!(
            "Cached messages: {}\nChats seen: {}\nView-once messages: {}\nTotal ever cached: {}\nRecovered after revoke: {}",
            stats.total_messages,
            stats.distinct_chats,
            stats.view_once_messages,
            counters.total_cached,
            counters.recovered_after_revoke,
        ))
    }
}

/// Group subject, owner, and member count.
pub struct GroupInfoCommand;

#[async_trait]
impl Command for GroupInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "groupinfo".into(),
            description: "Show metadata for this group".into(),
            usage: "groupinfo".into(),
            category: CommandCategory::Group,
        }
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<String, MarlinError> {
        require_group(ctx, "groupinfo")?;
        let metadata = ctx.connection.fetch_group_metadata(&ctx.chat_id).await?;
        let admins = metadata.participants.iter().filter(|p| p.is_admin).count();
        Ok(format!(
            "*{}*\nMembers: {} ({} admins)\nOwner: {}",
            metadata.subject,
            metadata.participants.len(),
            admins,
            metadata.owner.as_deref().unwrap_or("unknown"),
        ))
    }
}

/// Fetches the group invite code.
pub struct InviteCommand;

#[async_trait]
impl Command for InviteCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "invite".into(),
            description: "Get the invite link for this group".into(),
            usage: "invite".into(),
            category: CommandCategory::Group,
        }
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<String, MarlinError> {
        require_group(ctx, "invite")?;
        let code = ctx.connection.fetch_invite_code(&ctx.chat_id).await?;
        Ok(format!("https://chat.whatsapp.com/{code}"))
    }
}

/// Promote/demote/kick, parameterized by the membership action.
pub struct ParticipantCommand {
    name: &'static str,
    description: &'static str,
    action: GroupAction,
}

impl ParticipantCommand {
    pub fn promote() -> Self {
        Self {
            name: "promote",
            description: "Make a participant a group admin",
            action: GroupAction::Promote,
        }
    }

    pub fn demote() -> Self {
        Self {
            name: "demote",
            description: "Remove a participant's admin role",
            action: GroupAction::Demote,
        }
    }

    pub fn kick() -> Self {
        Self {
            name: "kick",
            description: "Remove a participant from the group",
            action: GroupAction::Remove,
        }
    }
}

#[async_trait]
impl Command for ParticipantCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: self.name.into(),
            description: self.description.into(),
            usage: format!("{} <participant>", self.name),
            category: CommandCategory::Admin,
        }
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<String, MarlinError> {
        require_group(ctx, self.name)?;
        if ctx.args.is_empty() {
            return Err(failure(self.name, format!("usage: {} <participant>", self.name)));
        }
        ctx.connection
            .update_group_participants(&ctx.chat_id, &ctx.args, self.action)
            .await?;
        Ok(format!("{} applied to {} participant(s)", self.action, ctx.args.len()))
    }
}

/// Persists the chatbot toggle for the current scope.
pub struct ChatbotToggleCommand {
    cache: Arc<MessageCache>,
}

#[async_trait]
impl Command for ChatbotToggleCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "chatbot".into(),
            description: "Enable or disable automated replies here".into(),
            usage: "chatbot <on|off>".into(),
            category: CommandCategory::Admin,
        }
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<String, MarlinError> {
        let enabled = match ctx.args.first().map(String::as_str) {
            Some("on") => true,
            Some("off") => false,
            _ => return Err(failure("chatbot", "usage: chatbot <on|off>")),
        };

        // Group chats toggle the chat-wide switch; direct chats toggle the
        // sender's own switch.
        let (scope, scope_id) = if ctx.is_group {
            (SettingScope::Group, ctx.chat_id.as_str())
        } else {
            (SettingScope::User, ctx.sender_id.as_str())
        };
        self.cache.set_chatbot_enabled(scope, scope_id, enabled).await?;

        Ok(format!(
            "Automated replies are now {} here",
            if enabled { "on" } else { "off" }
        ))
    }
}

/// Clears and rebuilds the registry from its current sources.
pub struct ReloadCommand {
    registry: Weak<RwLock<CommandRegistry>>,
}

#[async_trait]
impl Command for ReloadCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "reload".into(),
            description: "Rebuild the command registry".into(),
            usage: "reload".into(),
            category: CommandCategory::Owner,
        }
    }

    async fn execute(&self, _ctx: &CommandContext) -> Result<String, MarlinError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| failure("reload", "registry is gone"))?;
        let count = registry.write().await.reload();
        Ok(format!("Registry rebuilt: {count} commands"))
    }
}
