// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Marlin pipeline over the bridge
//! transport.
//!
//! A wiremock server plays the external bridge process: it accepts the
//! callback registration and outbound operations, while the test delivers
//! events to the webhook address it learned from the registration body.
//! This exercises the same wiring `marlin serve` builds.

use std::sync::Arc;
use std::time::Duration;

use marlin_agent::Orchestrator;
use marlin_chatbot::ResponderChain;
use marlin_commands::{builtin::builtin_sources, CommandRegistry};
use marlin_config::MarlinConfig;
use marlin_core::Transport;
use marlin_storage::MessageCache;
use marlin_transport_bridge::BridgeTransport;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct E2e {
    bridge: MockServer,
    cache: Arc<MessageCache>,
    orchestrator: Arc<Orchestrator>,
    _dir: tempfile::TempDir,
}

async fn e2e(chat_endpoints: Vec<String>) -> E2e {
    let bridge = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"identity": "15550009999@s.whatsapp.net"}),
        ))
        .mount(&bridge)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message_id": "w1"})),
        )
        .mount(&bridge)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("creds.json");
    std::fs::write(&creds, "{}").unwrap();

    let mut config = MarlinConfig::default();
    config.transport.credentials_path = creds.to_str().unwrap().to_string();
    config.storage.database_path = dir.path().join("cache.db").to_str().unwrap().to_string();
    config.bridge.url = Some(bridge.uri());
    config.bridge.listen_addr = "127.0.0.1:0".to_string();
    config.chatbot.endpoints = chat_endpoints;
    config.chatbot.timeout_secs = 2;

    let cache = Arc::new(MessageCache::new(config.storage.clone()));
    cache.initialize().await.unwrap();

    let registry = Arc::new(RwLock::new(CommandRegistry::new(
        config.commands.prefix.clone(),
    )));
    let sources = builtin_sources(&registry, Arc::clone(&cache));
    registry.write().await.load(sources);

    let chat = Arc::new(ResponderChain::from_config(&config.chatbot).unwrap());
    let transport: Arc<dyn Transport> =
        Arc::new(BridgeTransport::new(config.bridge.clone()).unwrap());

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        transport,
        Arc::clone(&cache),
        registry,
        chat,
    ));

    E2e {
        bridge,
        cache,
        orchestrator,
        _dir: dir,
    }
}

/// Wait for the bridge to see the callback registration and return the
/// webhook URL it carries.
async fn callback_url(bridge: &MockServer) -> String {
    for _ in 0..200 {
        if let Some(requests) = bridge.received_requests().await {
            for request in &requests {
                if request.url.path() == "/connect" {
                    let body: serde_json::Value =
                        serde_json::from_slice(&request.body).unwrap();
                    return body["callback_url"].as_str().unwrap().to_string();
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("bridge never saw a /connect registration");
}

/// Collect the text of every message the agent sent through the bridge.
async fn sent_texts(bridge: &MockServer) -> Vec<String> {
    let mut texts = Vec::new();
    if let Some(requests) = bridge.received_requests().await {
        for request in &requests {
            if request.url.path() == "/send" {
                let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                texts.push(body["text"].as_str().unwrap_or_default().to_string());
            }
        }
    }
    texts
}

async fn wait_for_send(bridge: &MockServer, needle: &str) -> String {
    for _ in 0..300 {
        for text in sent_texts(bridge).await {
            if text.contains(needle) {
                return text;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no /send containing `{needle}`; saw: {:?}", sent_texts(bridge).await);
}

async fn deliver(client: &reqwest::Client, callback: &str, event: serde_json::Value) {
    let status = client
        .post(callback)
        .json(&event)
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status.as_u16(), 204, "event delivery failed");
}

fn open_event() -> serde_json::Value {
    serde_json::json!({"type": "connection_update", "status": "open"})
}

fn text_batch(id: &str, chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message_batch",
        "kind": "notify",
        "messages": [{
            "id": id,
            "chat_id": chat_id,
            "sender_id": "friend@s.whatsapp.net",
            "sender_name": "Friend",
            "timestamp_ms": chrono::Utc::now().timestamp_millis(),
            "from_self": false,
            "payload": {"conversation": text}
        }]
    })
}

#[tokio::test]
async fn command_round_trip_through_the_bridge() {
    let fx = e2e(vec![]).await;

    let cancel = CancellationToken::new();
    let orchestrator = Arc::clone(&fx.orchestrator);
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { orchestrator.run(run_cancel).await });

    let callback = callback_url(&fx.bridge).await;
    let client = reqwest::Client::new();

    deliver(&client, &callback, open_event()).await;
    deliver(&client, &callback, text_batch("m1", "room@g.us", "!ping")).await;

    let reply = wait_for_send(&fx.bridge, "pong").await;
    assert_eq!(reply, "pong");

    // The command input itself was cached on the way through.
    let cached = fx.cache.get_message("m1", Some("room@g.us")).await.unwrap();
    assert_eq!(cached.unwrap().text, "!ping");

    cancel.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn chat_reply_round_trip_with_http_responder() {
    let responder = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/respond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"success": true, "text": "nice to meet you"}),
        ))
        .mount(&responder)
        .await;

    let fx = e2e(vec![format!("{}/respond", responder.uri())]).await;

    let cancel = CancellationToken::new();
    let orchestrator = Arc::clone(&fx.orchestrator);
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { orchestrator.run(run_cancel).await });

    let callback = callback_url(&fx.bridge).await;
    let client = reqwest::Client::new();

    deliver(&client, &callback, open_event()).await;
    deliver(
        &client,
        &callback,
        text_batch("m1", "friend@s.whatsapp.net", "hello there"),
    )
    .await;

    let reply = wait_for_send(&fx.bridge, "nice to meet you").await;
    // The configured footer rides along.
    assert!(reply.ends_with("_automated reply_"), "got: {reply}");

    cancel.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn revocation_recovery_through_the_bridge() {
    let fx = e2e(vec![]).await;

    let cancel = CancellationToken::new();
    let orchestrator = Arc::clone(&fx.orchestrator);
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { orchestrator.run(run_cancel).await });

    let callback = callback_url(&fx.bridge).await;
    let client = reqwest::Client::new();

    deliver(&client, &callback, open_event()).await;
    deliver(
        &client,
        &callback,
        text_batch("target", "room@g.us", "now you see me"),
    )
    .await;
    deliver(
        &client,
        &callback,
        serde_json::json!({
            "type": "message_batch",
            "kind": "notify",
            "messages": [{
                "id": "revoker",
                "chat_id": "room@g.us",
                "sender_id": "friend@s.whatsapp.net",
                "sender_name": "Friend",
                "timestamp_ms": chrono::Utc::now().timestamp_millis(),
                "from_self": false,
                "payload": {"protocolMessage": {"type": "REVOKE", "key": {"id": "target"}}}
            }]
        }),
    )
    .await;

    let recovered = wait_for_send(&fx.bridge, "now you see me").await;
    assert!(recovered.contains("Friend"));
    assert_eq!(fx.cache.counters().await.unwrap().recovered_after_revoke, 1);

    cancel.cancel();
    run.await.unwrap().unwrap();
}
