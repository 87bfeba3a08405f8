// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./marlin.toml` > `~/.config/marlin/marlin.toml`
//! > `/etc/marlin/marlin.toml`, with environment variable overrides via the
//! `MARLIN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MarlinConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/marlin/marlin.toml` (system-wide)
/// 3. `~/.config/marlin/marlin.toml` (user XDG config)
/// 4. `./marlin.toml` (local directory)
/// 5. `MARLIN_*` environment variables
pub fn load_config() -> Result<MarlinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarlinConfig::default()))
        .merge(Toml::file("/etc/marlin/marlin.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("marlin/marlin.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("marlin.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<MarlinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarlinConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MarlinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarlinConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `MARLIN_TRANSPORT_CREDENTIALS_PATH` must
/// map to `transport.credentials_path`, not `transport.credentials.path`.
fn env_provider() -> Env {
    Env::prefixed("MARLIN_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("transport_", "transport.", 1)
            .replacen("commands_", "commands.", 1)
            .replacen("chatbot_", "chatbot.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str(
            r##"
[commands]
prefix = "#"
"##,
        )
        .unwrap();
        assert_eq!(config.commands.prefix, "#");
        assert_eq!(config.agent.name, "marlin");
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.storage.database_path, "marlin.db");
    }
}
