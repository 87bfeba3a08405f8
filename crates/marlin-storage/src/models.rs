// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `marlin-core::types` for use across
//! collaborator boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use marlin_core::types::{CacheCounters, CacheStats, CachedMessage, SettingScope};
