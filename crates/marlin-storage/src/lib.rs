// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Marlin orchestrator.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for the message cache, the settings store, and durable counters.
//!
//! The cache is the basis for deleted-message recovery across restarts, so
//! writes are immediately durable: no batching window, `synchronous=FULL`.

pub mod cache;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use cache::MessageCache;
pub use database::Database;
pub use models::*;
