// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable message cache.
//!
//! [`MessageCache`] wraps the single-writer [`Database`] handle and owns the
//! ingestion rules: content derivation on write, last-write-wins replacement,
//! age-based sweep, and the durable counters. Deletion is deliberately NOT
//! triggered by the transport's revocation signal; revoked messages remain
//! queryable until the sweep expires them, which is what makes recovery work.

use std::time::Duration;

use marlin_config::model::StorageConfig;
use marlin_core::content;
use marlin_core::types::{
    CacheCounters, CacheStats, CachedMessage, SettingScope, TransportMessage,
};
use marlin_core::MarlinError;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::database::Database;
use crate::queries;

/// SQLite-backed message cache and settings store.
///
/// The database is lazily opened on the first call to [`initialize`];
/// read-side queries degrade gracefully before that point where the caller
/// contract requires it.
///
/// [`initialize`]: MessageCache::initialize
pub struct MessageCache {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl MessageCache {
    /// Create a new cache over the given configuration.
    ///
    /// The database connection is not opened until [`MessageCache::initialize`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database, applying migrations.
    pub async fn initialize(&self) -> Result<(), MarlinError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| MarlinError::Storage {
            source: "cache already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "message cache initialized");
        Ok(())
    }

    /// The configured retention window.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.config.retention_hours * 3600)
    }

    fn db(&self) -> Result<&Database, MarlinError> {
        self.db.get().ok_or_else(|| MarlinError::Storage {
            source: "cache not initialized -- call initialize() first".into(),
        })
    }

    /// Ingest one transport message.
    ///
    /// Returns `Ok(false)` without touching the store when the message
    /// carries no payload. Otherwise derives kind, text, and the view-once
    /// flag from the payload and upserts keyed by (id, chat id); the
    /// total-cached counter is incremented on every write, overwrites
    /// included.
    pub async fn add_message(&self, msg: &TransportMessage) -> Result<bool, MarlinError> {
        let Some(payload) = &msg.payload else {
            return Ok(false);
        };

        let cached = CachedMessage {
            id: msg.id.clone(),
            chat_id: msg.chat_id.clone(),
            sender_id: msg.sender_id.clone(),
            sender_name: msg.sender_name.clone(),
            timestamp_ms: msg.timestamp_ms,
            kind: content::derive_kind(payload),
            text: content::extract_text(payload),
            view_once: content::is_view_once(payload),
            payload: payload.clone(),
        };

        queries::messages::upsert_message(self.db()?, &cached).await?;
        Ok(true)
    }

    /// Look up a message; a supplied chat id narrows the match and a
    /// mismatch reads as not-found.
    pub async fn get_message(
        &self,
        id: &str,
        chat_id: Option<&str>,
    ) -> Result<Option<CachedMessage>, MarlinError> {
        queries::messages::get_message(self.db()?, id, chat_id).await
    }

    /// Remove a message unconditionally. Returns true when a row existed.
    pub async fn delete_message(&self, id: &str) -> Result<bool, MarlinError> {
        queries::messages::delete_message(self.db()?, id).await
    }

    /// Delete every record strictly older than the retention window and
    /// stamp the sweep, whether or not anything was removed.
    pub async fn cleanup_old_messages(&self) -> Result<usize, MarlinError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let cutoff_ms = now_ms - self.retention().as_millis() as i64;
        self.cleanup_older_than(cutoff_ms, now_ms).await
    }

    /// Sweep against an explicit boundary. Exposed for synthetic-boundary
    /// testing; production runs go through [`cleanup_old_messages`].
    ///
    /// [`cleanup_old_messages`]: MessageCache::cleanup_old_messages
    pub async fn cleanup_older_than(
        &self,
        cutoff_ms: i64,
        now_ms: i64,
    ) -> Result<usize, MarlinError> {
        let removed = queries::messages::sweep(self.db()?, cutoff_ms, now_ms).await?;
        if removed > 0 {
            debug!(removed, "cache sweep removed stale messages");
        }
        Ok(removed)
    }

    /// Count one successful lookup of a revoked message.
    pub async fn note_recovery(&self) -> Result<(), MarlinError> {
        queries::messages::note_recovery(self.db()?).await
    }

    /// Point-in-time aggregates.
    ///
    /// Returns zero-valued defaults when the store is not yet initialized
    /// rather than failing the caller.
    pub async fn stats(&self) -> Result<CacheStats, MarlinError> {
        match self.db.get() {
            Some(db) => queries::messages::stats(db).await,
            None => Ok(CacheStats::default()),
        }
    }

    /// The durable counters row.
    pub async fn counters(&self) -> Result<CacheCounters, MarlinError> {
        queries::messages::counters(self.db()?).await
    }

    /// Whether the chatbot is enabled for one scope entry (default: yes).
    pub async fn chatbot_enabled(
        &self,
        scope: SettingScope,
        scope_id: &str,
    ) -> Result<bool, MarlinError> {
        queries::settings::chatbot_enabled(self.db()?, scope, scope_id).await
    }

    /// Persist a chatbot toggle.
    pub async fn set_chatbot_enabled(
        &self,
        scope: SettingScope,
        scope_id: &str,
        enabled: bool,
    ) -> Result<(), MarlinError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        queries::settings::set_chatbot_enabled(self.db()?, scope, scope_id, enabled, now_ms).await
    }

    /// Checkpoint the WAL. Runs on its own periodic timer.
    pub async fn flush(&self) -> Result<(), MarlinError> {
        self.db()?.checkpoint().await
    }

    /// Checkpoint and release the store.
    pub async fn close(&self) -> Result<(), MarlinError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }
}
