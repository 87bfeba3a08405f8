// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and sane interval values.

use crate::diagnostic::ConfigError;
use crate::model::MarlinConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MarlinConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.transport.credentials_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "transport.credentials_path must not be empty".to_string(),
        });
    }

    if config.transport.reconnect_base_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.reconnect_base_ms must be positive".to_string(),
        });
    }

    if config.transport.reconnect_cap_ms < config.transport.reconnect_base_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "transport.reconnect_cap_ms ({}) must be at least reconnect_base_ms ({})",
                config.transport.reconnect_cap_ms, config.transport.reconnect_base_ms
            ),
        });
    }

    let prefix = config.commands.prefix.trim();
    if prefix.is_empty() {
        errors.push(ConfigError::Validation {
            message: "commands.prefix must not be empty".to_string(),
        });
    } else if prefix.contains(char::is_whitespace) {
        errors.push(ConfigError::Validation {
            message: format!("commands.prefix `{prefix}` must not contain whitespace"),
        });
    }

    if config.chatbot.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "chatbot.timeout_secs must be positive".to_string(),
        });
    }

    if config.storage.retention_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.retention_hours must be positive".to_string(),
        });
    }

    if config.storage.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.sweep_interval_secs must be positive".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = MarlinConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MarlinConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn whitespace_prefix_fails_validation() {
        let mut config = MarlinConfig::default();
        config.commands.prefix = "! ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("prefix"))));
    }

    #[test]
    fn cap_below_base_fails_validation() {
        let mut config = MarlinConfig::default();
        config.transport.reconnect_base_ms = 5000;
        config.transport.reconnect_cap_ms = 1000;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("reconnect_cap_ms"))));
    }

    #[test]
    fn zero_retention_fails_validation() {
        let mut config = MarlinConfig::default();
        config.storage.retention_hours = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = MarlinConfig::default();
        config.storage.database_path = "".to_string();
        config.commands.prefix = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
