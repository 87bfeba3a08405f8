// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event webhook.
//!
//! The bridge process delivers transport events as `type`-tagged JSON via
//! `POST /events`. When a shared secret is configured, each delivery must
//! carry an `x-marlin-signature` header holding the hex HMAC-SHA256 of the
//! raw body; unsigned or mis-signed deliveries are rejected.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use marlin_core::types::TransportEvent;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "x-marlin-signature";

#[derive(Clone)]
pub(crate) struct WebhookState {
    pub tx: mpsc::Sender<TransportEvent>,
    pub secret: Option<String>,
}

/// Build the webhook router.
pub(crate) fn app(state: WebhookState) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .route("/healthz", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(state)
}

async fn receive_event(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            warn!("rejected event delivery with bad signature");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event: TransportEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejected malformed event delivery");
            return StatusCode::BAD_REQUEST;
        }
    };

    debug!("bridge event received");
    match state.tx.send(event).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => {
            // The connection was dropped; tell the bridge to stop delivering.
            StatusCode::GONE
        }
    }
}

/// Constant-time verification of the hex HMAC-SHA256 signature.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Hex HMAC-SHA256 of a body, as the bridge computes it.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let body = br#"{"type":"presence_changed"}"#;
        let sig = sign_body("topsecret", body);
        assert!(verify_signature("topsecret", body, &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let body = b"payload";
        let sig = sign_body("secret-a", body);
        assert!(!verify_signature("secret-b", body, &sig));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let sig = sign_body("topsecret", b"original");
        assert!(!verify_signature("topsecret", b"tampered", &sig));
    }

    #[test]
    fn non_hex_signature_fails_cleanly() {
        assert!(!verify_signature("topsecret", b"body", "not hex at all"));
    }
}
