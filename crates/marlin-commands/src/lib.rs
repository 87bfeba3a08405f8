// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command registry and dispatcher for the Marlin orchestrator.
//!
//! The registry is an in-memory name-to-command table built from
//! caller-supplied [`CommandSource`]s. Load is tolerant: a failing source is
//! logged and skipped, and a name defined by two sources resolves to the
//! most-recently-loaded definition. Dispatch tokenizes post-prefix input,
//! executes the matched command inside an isolated failure boundary, and
//! always returns a structured [`CommandOutcome`].
//!
//! [`CommandSource`]: marlin_core::CommandSource

pub mod builtin;
pub mod registry;

pub use registry::{execute_command, CommandOutcome, CommandRegistry, Resolution};
