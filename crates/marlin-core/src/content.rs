// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content derivation rules over opaque transport payloads.
//!
//! The transport delivers each message as a serialized JSON object whose
//! shape varies by content type. These functions apply a fixed,
//! priority-ordered set of checks to classify the payload and pull out the
//! plain-text content, without the rest of the system ever depending on the
//! payload's structure.
//!
//! Text extraction priority: conversation text, then the caption of a media
//! payload, then the extended-text body. First match wins; otherwise the
//! empty string.

use serde_json::Value;

use crate::types::MessageKind;

/// Classify the payload into a [`MessageKind`].
pub fn derive_kind(payload: &Value) -> MessageKind {
    if payload.get("conversation").and_then(Value::as_str).is_some()
        || payload.get("extendedTextMessage").is_some()
    {
        MessageKind::Text
    } else if payload.get("imageMessage").is_some() {
        MessageKind::Image
    } else if payload.get("videoMessage").is_some() {
        MessageKind::Video
    } else if payload.get("audioMessage").is_some() {
        MessageKind::Audio
    } else if payload.get("documentMessage").is_some() {
        MessageKind::Document
    } else if payload.get("stickerMessage").is_some() {
        MessageKind::Sticker
    } else {
        MessageKind::Unknown
    }
}

/// Extract the plain-text content of the payload, or an empty string.
pub fn extract_text(payload: &Value) -> String {
    if let Some(text) = payload.get("conversation").and_then(Value::as_str) {
        return text.to_string();
    }

    for media in ["imageMessage", "videoMessage", "documentMessage"] {
        if let Some(caption) = payload
            .get(media)
            .and_then(|m| m.get("caption"))
            .and_then(Value::as_str)
        {
            return caption.to_string();
        }
    }

    if let Some(text) = payload
        .get("extendedTextMessage")
        .and_then(|m| m.get("text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    String::new()
}

/// True when the payload is flagged view-once by the sender.
pub fn is_view_once(payload: &Value) -> bool {
    for media in ["imageMessage", "videoMessage", "audioMessage"] {
        if payload
            .get(media)
            .and_then(|m| m.get("viewOnce"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return true;
        }
    }
    false
}

/// Returns the id of the message this payload revokes, if it is a
/// revocation marker.
pub fn revoked_target(payload: &Value) -> Option<String> {
    let proto = payload.get("protocolMessage")?;
    if proto.get("type").and_then(Value::as_str) != Some("REVOKE") {
        return None;
    }
    proto
        .get("key")
        .and_then(|k| k.get("id"))
        .and_then(Value::as_str)
        .map(String::from)
}
