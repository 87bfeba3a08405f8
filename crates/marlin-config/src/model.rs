// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Marlin orchestrator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Marlin configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarlinConfig {
    /// Agent identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Transport session and reconnect settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Command prefix and dispatch settings.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Automated chat-response settings.
    #[serde(default)]
    pub chatbot: ChatbotConfig,

    /// Message cache settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bridge transport adapter settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "marlin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Transport session and reconnect configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Path to the durable credential/session artifact. Connecting without
    /// it is a fatal startup condition.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,

    /// Identity the post-connect self-announcement is sent to.
    #[serde(default)]
    pub owner_id: Option<String>,

    /// Base delay for exponential reconnect backoff, in milliseconds.
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    /// Upper bound on any single backoff delay, in milliseconds.
    #[serde(default = "default_reconnect_cap_ms")]
    pub reconnect_cap_ms: u64,

    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Reject incoming call offers automatically.
    #[serde(default)]
    pub auto_reject_calls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            owner_id: None,
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_cap_ms: default_reconnect_cap_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            auto_reject_calls: false,
        }
    }
}

fn default_credentials_path() -> String {
    "session/creds.json".to_string()
}

fn default_reconnect_base_ms() -> u64 {
    1000
}

fn default_reconnect_cap_ms() -> u64 {
    60_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

/// Command prefix and dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsConfig {
    /// Prefix that marks a message as command input.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

/// Automated chat-response configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatbotConfig {
    /// Master switch for automated responses. Per-user and per-group
    /// toggles in the settings store narrow this further.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Responder endpoints, tried in order until one succeeds.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Per-call budget in seconds; an exceeded budget falls through to the
    /// next endpoint.
    #[serde(default = "default_chatbot_timeout_secs")]
    pub timeout_secs: u64,

    /// Informational footer appended to every automated reply.
    #[serde(default = "default_footer")]
    pub footer: String,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: Vec::new(),
            timeout_secs: default_chatbot_timeout_secs(),
            footer: default_footer(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chatbot_timeout_secs() -> u64 {
    15
}

fn default_footer() -> String {
    "_automated reply_".to_string()
}

/// Message cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Retention window for cached messages, in hours.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Interval between cache sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Interval between WAL checkpoint flushes, in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

fn default_database_path() -> String {
    "marlin.db".to_string()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_flush_interval_secs() -> u64 {
    300
}

/// Bridge transport adapter configuration.
///
/// The bridge is an external process that owns the actual protocol session
/// and exchanges events/operations with Marlin over HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the bridge process. `None` disables the adapter.
    #[serde(default)]
    pub url: Option<String>,

    /// Address the event webhook listens on.
    #[serde(default = "default_bridge_listen_addr")]
    pub listen_addr: String,

    /// Shared secret for webhook signature verification. `None` disables
    /// verification.
    #[serde(default)]
    pub secret: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: None,
            listen_addr: default_bridge_listen_addr(),
            secret: None,
        }
    }
}

fn default_bridge_listen_addr() -> String {
    "127.0.0.1:8799".to_string()
}
