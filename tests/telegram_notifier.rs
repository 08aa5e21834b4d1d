//! Telegram delivery against a mock Bot API

use cross_venue_arb::common::errors::ArbError;
use cross_venue_arb::common::traits::Notifier;
use cross_venue_arb::common::types::{Notification, Severity};
use cross_venue_arb::config::types::TelegramConfig;
use cross_venue_arb::notify::TelegramNotifier;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new(&TelegramConfig {
        enabled: true,
        bot_token: "123:abc".into(),
        chat_id: "-1001".into(),
        api_url: server.uri(),
    })
    .unwrap()
}

fn alert() -> Notification {
    Notification {
        severity: Severity::Critical,
        title: "Arbitrage sell leg failed, position open: SOL/USDT".into(),
        body: "Bought on a at 99 (order a-1)".into(),
    }
}

#[tokio::test]
async fn test_send_message_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).send(&alert()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["chat_id"], "-1001");
    let text = body["text"].as_str().unwrap();
    assert!(text.contains("position open: SOL/USDT"));
    assert!(text.contains("order a-1"));
}

#[tokio::test]
async fn test_api_error_is_notification_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&server)
        .await;

    let err = notifier(&server).send(&alert()).await.unwrap_err();
    assert!(matches!(err, ArbError::Notification(_)));
}
