// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The name-to-command table and the dispatch path.

use std::collections::HashMap;
use std::sync::Arc;

use marlin_core::traits::command::{Command, CommandCategory, CommandContext, CommandSource, CommandSpec};
use tracing::{info, warn};

/// Marker prepended to command-failure replies.
const FAILURE_MARKER: &str = "\u{274c}";

/// Minimum Jaro-Winkler similarity to offer a did-you-mean hint.
const SUGGESTION_THRESHOLD: f64 = 0.78;

/// Structured result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

/// Result of resolving raw input against the table, before execution.
///
/// Splitting resolution from execution lets callers that share the registry
/// behind a lock release it before awaiting the command body.
pub enum Resolution {
    Known {
        command: Arc<dyn Command>,
        args: Vec<String>,
    },
    Unknown {
        message: String,
    },
}

/// In-memory registry of invocable commands.
///
/// Holds the sources it was last loaded from so [`reload`] can clear and
/// fully rebuild the table on demand; there is no incremental patching.
///
/// [`reload`]: CommandRegistry::reload
pub struct CommandRegistry {
    prefix: String,
    sources: Vec<Arc<dyn CommandSource>>,
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry for the given command prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sources: Vec::new(),
            commands: HashMap::new(),
        }
    }

    /// The configured command prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Replace the source list and rebuild the table from it.
    ///
    /// Per-source failures are logged and skipped; a partial registry is
    /// acceptable. When two sources define the same name, the later
    /// registration silently wins. Returns the number of registered commands.
    pub fn load(&mut self, sources: Vec<Arc<dyn CommandSource>>) -> usize {
        self.sources = sources;
        self.rebuild()
    }

    /// Clear and fully rebuild the table from the current sources.
    pub fn reload(&mut self) -> usize {
        self.rebuild()
    }

    fn rebuild(&mut self) -> usize {
        self.commands.clear();
        for source in &self.sources {
            match source.load() {
                Ok(commands) => {
                    for command in commands {
                        let name = command.spec().name.to_lowercase();
                        self.commands.insert(name, command);
                    }
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "command source failed to load, skipping");
                }
            }
        }
        info!(commands = self.commands.len(), "command registry built");
        self.commands.len()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Tokenize raw post-prefix input and resolve the command name.
    ///
    /// The first whitespace token, case-folded, is the name; the remaining
    /// tokens are positional arguments. Unknown names produce a hint naming
    /// the prefix and the `menu` command, with a did-you-mean suggestion
    /// when a registered name is close.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let mut tokens = raw.split_whitespace();
        let Some(name) = tokens.next() else {
            return Resolution::Unknown {
                message: format!(
                    "No command given. Send {}menu to list available commands.",
                    self.prefix
                ),
            };
        };

        let name = name.to_lowercase();
        let args: Vec<String> = tokens.map(String::from).collect();

        match self.commands.get(&name) {
            Some(command) => Resolution::Known {
                command: Arc::clone(command),
                args,
            },
            None => {
                let mut message = format!("Unknown command `{name}`.");
                if let Some(suggestion) = self.suggest(&name) {
                    message.push_str(&format!(" Did you mean {}{suggestion}?", self.prefix));
                }
                message.push_str(&format!(
                    " Send {}menu to list available commands.",
                    self.prefix
                ));
                Resolution::Unknown { message }
            }
        }
    }

    /// Resolve and execute in one step.
    ///
    /// `ctx.args` is filled from the tokenized input. Never panics or
    /// propagates: every path lands in a [`CommandOutcome`].
    pub async fn dispatch(&self, raw: &str, ctx: CommandContext) -> CommandOutcome {
        match self.resolve(raw) {
            Resolution::Unknown { message } => CommandOutcome {
                success: false,
                message,
            },
            Resolution::Known { command, args } => execute_command(&command, ctx, args).await,
        }
    }

    /// Closest registered name to `unknown`, if any is similar enough.
    fn suggest(&self, unknown: &str) -> Option<String> {
        let mut best_score = SUGGESTION_THRESHOLD;
        let mut best_match = None;
        for name in self.commands.keys() {
            let score = strsim::jaro_winkler(unknown, name);
            if score > best_score {
                best_score = score;
                best_match = Some(name.clone());
            }
        }
        best_match
    }

    /// Render the categorized help menu.
    ///
    /// Commands are grouped by category in the fixed display order, empty
    /// categories are omitted, and a total-count footer is appended. Pure
    /// projection over the table; no side effects.
    pub fn help_menu(&self) -> String {
        let mut by_category: HashMap<CommandCategory, Vec<CommandSpec>> = HashMap::new();
        for command in self.commands.values() {
            let spec = command.spec();
            by_category.entry(spec.category).or_default().push(spec);
        }

        let mut out = String::new();
        for category in CommandCategory::DISPLAY_ORDER {
            let Some(specs) = by_category.get_mut(&category) else {
                continue;
            };
            specs.sort_by(|a, b| a.name.cmp(&b.name));

            out.push_str(&format!("*{}*\n", category.heading()));
            for spec in specs.iter() {
                out.push_str(&format!(
                    "  {}{} - {}\n",
                    self.prefix, spec.usage, spec.description
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!("{} commands available", self.commands.len()));
        out
    }
}

/// Run one command inside an isolated failure boundary.
///
/// An execution error is logged with the offending command name and
/// surfaces as a structured failure carrying the error's message text; it
/// never crashes the orchestrator.
pub async fn execute_command(
    command: &Arc<dyn Command>,
    mut ctx: CommandContext,
    args: Vec<String>,
) -> CommandOutcome {
    ctx.args = args;
    let name = command.spec().name;
    match command.execute(&ctx).await {
        Ok(message) => CommandOutcome {
            success: true,
            message,
        },
        Err(e) => {
            warn!(command = name.as_str(), error = %e, "command execution failed");
            CommandOutcome {
                success: false,
                message: format!("{FAILURE_MARKER} {e}"),
            }
        }
    }
}
