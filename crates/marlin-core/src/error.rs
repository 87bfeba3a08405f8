// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Marlin session orchestrator.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Marlin collaborator traits and
/// core operations.
///
/// Only three variants terminate the orchestrator run: [`MissingCredentials`]
/// (startup precondition), [`Unauthorized`] (the transport refused the
/// session and forbade retry), and [`ReconnectExhausted`] (the bounded
/// backoff ran out of attempts). Everything else is contained at its call
/// site and surfaced as a result value or a log line.
///
/// [`MissingCredentials`]: MarlinError::MissingCredentials
/// [`Unauthorized`]: MarlinError::Unauthorized
/// [`ReconnectExhausted`]: MarlinError::ReconnectExhausted
#[derive(Debug, Error)]
pub enum MarlinError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// The durable credential artifact is absent; connecting is pointless.
    #[error("credential artifact not found at {path}; authenticate first")]
    MissingCredentials { path: String },

    /// The transport reported a logged-out close. Re-authentication is
    /// required out of band; no reconnect is attempted.
    #[error("transport session is no longer authorized")]
    Unauthorized,

    /// The bounded reconnect policy ran out of attempts.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (connection failure, send failure, metadata query).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Chat-response provider errors (HTTP failure, malformed reply).
    #[error("chatbot error: {message}")]
    Chatbot {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A command's execute body failed. Carried back to the chat as a
    /// structured failure outcome, never as a crash.
    #[error("command `{name}` failed: {message}")]
    CommandFailed { name: String, message: String },

    /// An external call exceeded its fixed budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarlinError {
    /// True for the error classes that terminate the orchestrator run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MarlinError::MissingCredentials { .. }
                | MarlinError::Unauthorized
                | MarlinError::ReconnectExhausted { .. }
        )
    }
}
