// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable chatbot toggle storage.
//!
//! Toggles exist at user and group scope; both default to enabled, so the
//! absence of a row reads as `true`.

use marlin_core::types::SettingScope;
use marlin_core::MarlinError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Whether the chatbot is enabled for one scope entry.
pub async fn chatbot_enabled(
    db: &Database,
    scope: SettingScope,
    scope_id: &str,
) -> Result<bool, MarlinError> {
    let scope = scope.to_string();
    let scope_id = scope_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT chatbot_enabled FROM chat_settings WHERE scope = ?1 AND scope_id = ?2",
                params![scope, scope_id],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(v) => Ok(v != 0),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(true),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set the chatbot toggle for one scope entry.
pub async fn set_chatbot_enabled(
    db: &Database,
    scope: SettingScope,
    scope_id: &str,
    enabled: bool,
    now_ms: i64,
) -> Result<(), MarlinError> {
    let scope = scope.to_string();
    let scope_id = scope_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_settings (scope, scope_id, chatbot_enabled, updated_at_ms)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (scope, scope_id) DO UPDATE SET
                     chatbot_enabled = excluded.chatbot_enabled,
                     updated_at_ms = excluded.updated_at_ms",
                params![scope, scope_id, enabled as i64, now_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn toggles_default_to_enabled() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("settings.db").to_str().unwrap())
            .await
            .unwrap();

        assert!(chatbot_enabled(&db, SettingScope::User, "someone").await.unwrap());
        assert!(chatbot_enabled(&db, SettingScope::Group, "room@g.us").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_and_flip_toggle() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("settings.db").to_str().unwrap())
            .await
            .unwrap();

        set_chatbot_enabled(&db, SettingScope::Group, "room@g.us", false, 1_000)
            .await
            .unwrap();
        assert!(!chatbot_enabled(&db, SettingScope::Group, "room@g.us").await.unwrap());

        // User scope is independent of group scope.
        assert!(chatbot_enabled(&db, SettingScope::User, "room@g.us").await.unwrap());

        set_chatbot_enabled(&db, SettingScope::Group, "room@g.us", true, 2_000)
            .await
            .unwrap();
        assert!(chatbot_enabled(&db, SettingScope::Group, "room@g.us").await.unwrap());

        db.close().await.unwrap();
    }
}
