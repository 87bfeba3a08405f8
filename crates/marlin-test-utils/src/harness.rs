// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for integration tests.

use std::sync::Arc;

use marlin_config::model::StorageConfig;
use marlin_core::types::TransportMessage;
use marlin_storage::MessageCache;

/// An initialized message cache backed by a temp directory.
///
/// The `TempDir` must be kept alive for the duration of the test.
pub async fn temp_cache() -> (Arc<MessageCache>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = StorageConfig {
        database_path: dir
            .path()
            .join("cache.db")
            .to_str()
            .expect("utf-8 temp path")
            .to_string(),
        ..StorageConfig::default()
    };
    let cache = Arc::new(MessageCache::new(config));
    cache.initialize().await.expect("initialize cache");
    (cache, dir)
}

/// A live text message for ingestion tests.
pub fn text_message(id: &str, chat_id: &str, sender_id: &str, text: &str) -> TransportMessage {
    TransportMessage {
        id: id.to_string(),
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        sender_name: "Tester".to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        from_self: false,
        payload: Some(serde_json::json!({"conversation": text})),
    }
}
