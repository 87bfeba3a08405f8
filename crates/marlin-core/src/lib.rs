// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and common types for the Marlin
//! session orchestrator.
//!
//! The orchestrator's external collaborators are modeled as traits here:
//! the messaging transport ([`Transport`], [`TransportConnection`]), the
//! chat-response provider ([`ChatResponder`]), and pluggable commands
//! ([`Command`], [`CommandSource`]). Concrete implementations live in the
//! adapter crates; everything above this crate programs against the seams.

pub mod content;
pub mod error;
pub mod traits;
pub mod types;

pub use error::MarlinError;
pub use traits::chatbot::{ChatContext, ChatReply, ChatResponder};
pub use traits::command::{Command, CommandCategory, CommandContext, CommandSource, CommandSpec};
pub use traits::transport::{Transport, TransportConnection};
