// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP bridge transport adapter.
//!
//! The actual protocol session lives in an external bridge process; this
//! adapter is the [`Transport`] seam over it. Each `connect()` binds a local
//! webhook for inbound events, registers the callback with the bridge, and
//! returns a fresh [`BridgeConnection`] whose imperative operations map to
//! HTTP calls on the bridge. Dropping the connection tears the webhook down,
//! so every reconnect gets a clean handle.

pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use marlin_config::model::BridgeConfig;
use marlin_core::types::{
    GroupAction, GroupMetadata, MessageId, OutboundMessage, TransportEvent,
};
use marlin_core::{MarlinError, Transport, TransportConnection};

use crate::webhook::WebhookState;

/// Budget for any single HTTP call against the bridge.
const BRIDGE_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Capacity of the inbound event queue.
const EVENT_QUEUE_DEPTH: usize = 256;

fn transport_err(message: impl Into<String>) -> MarlinError {
    MarlinError::Transport {
        message: message.into(),
        source: None,
    }
}

fn http_err(context: &str, e: reqwest::Error) -> MarlinError {
    MarlinError::Transport {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Transport factory over one configured bridge.
pub struct BridgeTransport {
    config: BridgeConfig,
    client: reqwest::Client,
}

impl BridgeTransport {
    pub fn new(config: BridgeConfig) -> Result<Self, MarlinError> {
        if config.url.is_none() {
            return Err(MarlinError::Config(
                "bridge.url is not set; the bridge transport is disabled".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(BRIDGE_CALL_TIMEOUT)
            .build()
            .map_err(|e| http_err("failed to build HTTP client", e))?;
        Ok(Self { config, client })
    }

    fn bridge_url(&self) -> &str {
        self.config.url.as_deref().expect("checked in new()")
    }

    /// Bind the webhook, register the callback, and return the concrete
    /// connection handle.
    pub async fn connect_bridge(&self) -> Result<Arc<BridgeConnection>, MarlinError> {
        // Bind the webhook before registering so no event delivery is lost.
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let state = WebhookState {
            tx,
            secret: self.config.secret.clone(),
        };

        let listener = tokio::net::TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| MarlinError::Transport {
                message: format!("failed to bind webhook on {}: {e}", self.config.listen_addr),
                source: Some(Box::new(e)),
            })?;
        let local_addr = listener.local_addr().map_err(|e| MarlinError::Transport {
            message: format!("failed to resolve webhook address: {e}"),
            source: Some(Box::new(e)),
        })?;

        let app = webhook::app(state);
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(error = %e, "webhook server exited");
            }
        });
        debug!(addr = %local_addr, "event webhook listening");

        // Register the callback; the bridge starts (or resumes) its session
        // and will deliver a connection_update once the wire is open.
        let callback_url = format!("http://{local_addr}/events");
        let response = self
            .client
            .post(format!("{}/connect", self.bridge_url()))
            .json(&serde_json::json!({ "callback_url": callback_url }))
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let status = response.status();
                server.abort();
                return Err(transport_err(format!("bridge connect returned {status}")));
            }
            Err(e) => {
                server.abort();
                return Err(http_err("bridge connect failed", e));
            }
        };

        let connected: ConnectResponse = match response.json().await {
            Ok(connected) => connected,
            Err(e) => {
                server.abort();
                return Err(http_err("malformed bridge connect response", e));
            }
        };

        info!(
            identity = connected.identity.as_deref().unwrap_or("unknown"),
            "bridge session registered"
        );

        Ok(Arc::new(BridgeConnection {
            client: self.client.clone(),
            bridge_url: self.bridge_url().to_string(),
            identity: connected.identity,
            local_addr,
            events: Mutex::new(rx),
            server,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    #[serde(default)]
    identity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct InviteResponse {
    code: String,
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>, MarlinError> {
        let conn = self.connect_bridge().await?;
        Ok(conn)
    }
}

/// One live session against the bridge.
pub struct BridgeConnection {
    client: reqwest::Client,
    bridge_url: String,
    identity: Option<String>,
    local_addr: SocketAddr,
    events: Mutex<mpsc::Receiver<TransportEvent>>,
    server: JoinHandle<()>,
}

impl BridgeConnection {
    /// Address the event webhook is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn post_op<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, MarlinError> {
        let response = self
            .client
            .post(format!("{}{path}", self.bridge_url))
            .json(body)
            .send()
            .await
            .map_err(|e| http_err(path, e))?;
        if !response.status().is_success() {
            return Err(transport_err(format!(
                "bridge {path} returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

impl Drop for BridgeConnection {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait]
impl TransportConnection for BridgeConnection {
    fn identity(&self) -> Option<String> {
        self.identity.clone()
    }

    async fn next_event(&self) -> Result<TransportEvent, MarlinError> {
        let mut rx = self.events.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| transport_err("event webhook closed"))
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MarlinError> {
        let response = self.post_op("/send", &msg).await?;
        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| http_err("malformed send response", e))?;
        Ok(MessageId(sent.message_id))
    }

    async fn fetch_group_metadata(&self, group_id: &str) -> Result<GroupMetadata, MarlinError> {
        let response = self
            .post_op("/group-metadata", &serde_json::json!({ "group_id": group_id }))
            .await?;
        response
            .json()
            .await
            .map_err(|e| http_err("malformed group metadata response", e))
    }

    async fn update_group_participants(
        &self,
        group_id: &str,
        participant_ids: &[String],
        action: GroupAction,
    ) -> Result<(), MarlinError> {
        self.post_op(
            "/group-participants",
            &serde_json::json!({
                "group_id": group_id,
                "participants": participant_ids,
                "action": action,
            }),
        )
        .await?;
        Ok(())
    }

    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), MarlinError> {
        self.post_op(
            "/reject-call",
            &serde_json::json!({ "call_id": call_id, "from": from }),
        )
        .await?;
        Ok(())
    }

    async fn fetch_invite_code(&self, group_id: &str) -> Result<String, MarlinError> {
        let response = self
            .post_op("/invite-code", &serde_json::json!({ "group_id": group_id }))
            .await?;
        let invite: InviteResponse = response
            .json()
            .await
            .map_err(|e| http_err("malformed invite response", e))?;
        Ok(invite.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn bridge_with(server: &MockServer, secret: Option<&str>) -> BridgeTransport {
        Mock::given(method("POST"))
            .and(path("/connect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"identity": "15550009999@s.whatsapp.net"}),
            ))
            .mount(server)
            .await;

        BridgeTransport::new(BridgeConfig {
            url: Some(server.uri()),
            listen_addr: "127.0.0.1:0".to_string(),
            secret: secret.map(String::from),
        })
        .unwrap()
    }

    fn event_body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": "presence_changed",
            "presence": {"chat_id": "room@g.us", "sender_id": "x", "presence": "composing"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn missing_url_is_a_config_error() {
        let err = match BridgeTransport::new(BridgeConfig::default()) {
            Ok(_) => panic!("expected a config error"),
            Err(e) => e,
        };
        assert!(matches!(err, MarlinError::Config(_)));
    }

    #[tokio::test]
    async fn connect_registers_callback_and_captures_identity() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, None).await;

        let conn = transport.connect_bridge().await.unwrap();
        assert_eq!(conn.identity().as_deref(), Some("15550009999@s.whatsapp.net"));
    }

    #[tokio::test]
    async fn unreachable_bridge_fails_retryably() {
        let transport = BridgeTransport::new(BridgeConfig {
            url: Some("http://127.0.0.1:9".to_string()),
            listen_addr: "127.0.0.1:0".to_string(),
            secret: None,
        })
        .unwrap();

        let err = match transport.connect().await {
            Ok(_) => panic!("expected a transport error"),
            Err(e) => e,
        };
        assert!(matches!(err, MarlinError::Transport { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn delivered_events_reach_next_event() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, None).await;
        let conn = transport.connect_bridge().await.unwrap();
        let addr = conn.local_addr();

        let client = reqwest::Client::new();
        let status = client
            .post(format!("http://{addr}/events"))
            .header("content-type", "application/json")
            .body(event_body())
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 204);

        let event = tokio::time::timeout(Duration::from_secs(2), conn.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, TransportEvent::PresenceChanged { .. }));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, Some("topsecret")).await;
        let conn = transport.connect_bridge().await.unwrap();
        let addr = conn.local_addr();

        let body = event_body();
        let client = reqwest::Client::new();

        // Unsigned delivery is refused.
        let status = client
            .post(format!("http://{addr}/events"))
            .header("content-type", "application/json")
            .body(body.clone())
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 401);

        // Properly signed delivery is accepted.
        let signature = webhook::sign_body("topsecret", &body);
        let status = client
            .post(format!("http://{addr}/events"))
            .header("content-type", "application/json")
            .header(webhook::SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 204);

        let event = tokio::time::timeout(Duration::from_secs(2), conn.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, TransportEvent::PresenceChanged { .. }));
    }

    #[tokio::test]
    async fn malformed_event_is_rejected_with_400() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, None).await;
        let conn = transport.connect_bridge().await.unwrap();
        let addr = conn.local_addr();

        let client = reqwest::Client::new();
        let status = client
            .post(format!("http://{addr}/events"))
            .header("content-type", "application/json")
            .body("{\"type\": \"no_such_event\"}")
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 400);
    }

    #[tokio::test]
    async fn send_and_invite_map_to_bridge_calls() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, None).await;

        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(serde_json::json!({"chat_id": "room@g.us"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message_id": "wire-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/invite-code"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": "AbCdEf"})),
            )
            .mount(&server)
            .await;

        let conn = transport.connect_bridge().await.unwrap();

        let id = conn
            .send(OutboundMessage::text("room@g.us", "hello"))
            .await
            .unwrap();
        assert_eq!(id.0, "wire-1");

        let code = conn.fetch_invite_code("room@g.us").await.unwrap();
        assert_eq!(code, "AbCdEf");
    }

    #[tokio::test]
    async fn failed_operation_surfaces_status() {
        let server = MockServer::start().await;
        let transport = bridge_with(&server, None).await;

        Mock::given(method("POST"))
            .and(path("/reject-call"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let conn = transport.connect_bridge().await.unwrap();
        let err = conn.reject_call("call-1", "caller").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
