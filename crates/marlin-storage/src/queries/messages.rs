// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message cache CRUD, sweep, and counter operations.

use std::str::FromStr;

use marlin_core::types::{CacheCounters, CacheStats, CachedMessage, MessageKind};
use marlin_core::MarlinError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Upsert a message keyed by (id, chat_id).
///
/// A later write with the same key replaces the prior record. The
/// total-cached counter is incremented on every write, overwrites included,
/// in the same transaction as the row itself.
pub async fn upsert_message(db: &Database, msg: &CachedMessage) -> Result<(), MarlinError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let payload = msg.payload.to_string();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages
                     (id, chat_id, sender_id, sender_name, timestamp_ms, kind, text, view_once, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (id, chat_id) DO UPDATE SET
                     sender_id = excluded.sender_id,
                     sender_name = excluded.sender_name,
                     timestamp_ms = excluded.timestamp_ms,
                     kind = excluded.kind,
                     text = excluded.text,
                     view_once = excluded.view_once,
                     payload = excluded.payload",
                params![
                    msg.id,
                    msg.chat_id,
                    msg.sender_id,
                    msg.sender_name,
                    msg.timestamp_ms,
                    msg.kind.to_string(),
                    msg.text,
                    msg.view_once as i64,
                    payload,
                ],
            )?;
            tx.execute(
                "UPDATE cache_counters SET total_cached = total_cached + 1 WHERE id = 1",
                [],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a message by id, optionally narrowed to one chat.
///
/// A chat-id mismatch is a not-found result, never an error.
pub async fn get_message(
    db: &Database,
    id: &str,
    chat_id: Option<&str>,
) -> Result<Option<CachedMessage>, MarlinError> {
    let id = id.to_string();
    let chat_id = chat_id.map(String::from);
    db.connection()
        .call(move |conn| {
            let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<CachedMessage> {
                let kind: String = row.get(5)?;
                let payload: String = row.get(8)?;
                Ok(CachedMessage {
                    id: row.get(0)?,
                    chat_id: row.get(1)?,
                    sender_id: row.get(2)?,
                    sender_name: row.get(3)?,
                    timestamp_ms: row.get(4)?,
                    kind: MessageKind::from_str(&kind).unwrap_or_default(),
                    text: row.get(6)?,
                    view_once: row.get::<_, i64>(7)? != 0,
                    payload: serde_json::from_str(&payload)
                        .unwrap_or(serde_json::Value::Null),
                })
            };

            let result = match chat_id {
                Some(chat) => conn.query_row(
                    "SELECT id, chat_id, sender_id, sender_name, timestamp_ms, kind, text, view_once, payload
                     FROM messages WHERE id = ?1 AND chat_id = ?2",
                    params![id, chat],
                    map_row,
                ),
                None => conn.query_row(
                    "SELECT id, chat_id, sender_id, sender_name, timestamp_ms, kind, text, view_once, payload
                     FROM messages WHERE id = ?1",
                    params![id],
                    map_row,
                ),
            };

            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a message unconditionally by id. Returns true when a row existed.
pub async fn delete_message(db: &Database, id: &str) -> Result<bool, MarlinError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every row strictly older than `cutoff_ms` and stamp the sweep.
///
/// The sweep timestamp is updated even when no rows matched.
pub async fn sweep(db: &Database, cutoff_ms: i64, now_ms: i64) -> Result<usize, MarlinError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM messages WHERE timestamp_ms < ?1",
                params![cutoff_ms],
            )?;
            tx.execute(
                "UPDATE cache_counters SET last_sweep_ms = ?1 WHERE id = 1",
                params![now_ms],
            )?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Increment the deleted-then-recovered counter.
pub async fn note_recovery(db: &Database) -> Result<(), MarlinError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "UPDATE cache_counters
                 SET recovered_after_revoke = recovered_after_revoke + 1
                 WHERE id = 1",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Point-in-time aggregates over the cache rows.
pub async fn stats(db: &Database) -> Result<CacheStats, MarlinError> {
    db.connection()
        .call(|conn| {
            let row = conn.query_row(
                "SELECT COUNT(*),
                        COUNT(DISTINCT chat_id),
                        COALESCE(SUM(view_once), 0)
                 FROM messages",
                [],
                |row| {
                    Ok(CacheStats {
                        total_messages: row.get(0)?,
                        distinct_chats: row.get(1)?,
                        view_once_messages: row.get(2)?,
                    })
                },
            )?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}

/// The durable counters row.
pub async fn counters(db: &Database) -> Result<CacheCounters, MarlinError> {
    db.connection()
        .call(|conn| {
            let row = conn.query_row(
                "SELECT total_cached, recovered_after_revoke, last_sweep_ms
                 FROM cache_counters WHERE id = 1",
                [],
                |row| {
                    Ok(CacheCounters {
                        total_cached: row.get(0)?,
                        recovered_after_revoke: row.get(1)?,
                        last_sweep_ms: row.get(2)?,
                    })
                },
            )?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}
