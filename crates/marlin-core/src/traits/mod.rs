// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for the orchestrator's external collaborators.

pub mod chatbot;
pub mod command;
pub mod transport;
