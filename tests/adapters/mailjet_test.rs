//! Mailjet adapter tests.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use missive_relay::providers::{MailjetConfig, MailjetMailer, SenderConfig};
use missive_relay::{MailAttributes, Mailer, SendError, TransportKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn config() -> MailjetConfig {
    MailjetConfig {
        api_key_public: "public_key".into(),
        api_key_private: "private_key".into(),
        sender: SenderConfig {
            address: "tony.stark@example.com".into(),
            name: "Tony Stark".into(),
        },
    }
}

fn valid_mail() -> MailAttributes {
    MailAttributes::new("steve.rogers@example.com", "Hello, Avengers!", "<h1>Hello</h1>")
}

fn mailer(server: &MockServer) -> MailjetMailer {
    MailjetMailer::new(config()).base_url(server.uri())
}

fn success_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Messages": [{
            "Status": "success",
            "To": [{
                "Email": "steve.rogers@example.com",
                "MessageUUID": "cb927469-36fd-4c02-bce4-0d199929a207",
                "MessageID": 70650219165027410_i64,
                "MessageHref": "https://api.mailjet.com/v3/message/70650219165027410"
            }]
        }]
    }))
}

// ============================================================================
// Basic Delivery Tests
// ============================================================================

#[tokio::test]
async fn successful_delivery_returns_message_id() {
    let server = MockServer::start().await;
    let auth = format!("Basic {}", BASE64.encode("public_key:private_key"));

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("Authorization", auth.as_str()))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "Messages": [{
                "From": {"Email": "tony.stark@example.com", "Name": "Tony Stark"},
                "To": [{"Email": "steve.rogers@example.com"}],
                "Subject": "Hello, Avengers!",
                "HTMLPart": "<h1>Hello</h1>"
            }]
        })))
        .respond_with(success_response())
        .expect(1)
        .mount(&server)
        .await;

    let delivery = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(delivery.message_id, "70650219165027410");
}

#[tokio::test]
async fn success_without_messages_generates_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Messages": []})))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!delivery.message_id.is_empty());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn embedded_error_is_rejected_with_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Messages": [{
                "Status": "error",
                "Errors": [{
                    "ErrorIdentifier": "f987008f-251a-4dff-8ffc-40f1583ad7bc",
                    "ErrorCode": "mj-0004",
                    "StatusCode": 400,
                    "ErrorMessage": "Type mismatch. Expected type \"array of emails\".",
                    "ErrorRelatedTo": ["HTMLPart", "TemplateLanguage"]
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        SendError::Rejected {
            provider,
            status,
            code,
            message,
        } => {
            assert_eq!(provider, "mailjet");
            assert_eq!(status, 200);
            assert_eq!(code.as_deref(), Some("mj-0004"));
            assert!(message.starts_with("Type mismatch"));
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_is_rejected_with_body() {
    let server = MockServer::start().await;
    let body = r#"{"ErrorMessage":"API key authentication/authorization failure","StatusCode":401}"#;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        SendError::Rejected {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, 401);
            assert!(code.is_none());
            assert_eq!(message, body);
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn unparsable_success_body_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::Transport {
            kind: TransportKind::Body,
            ..
        }
    ));
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn cancelled_token_makes_no_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(success_response())
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let err = mailer(&server)
        .deliver(&valid_mail(), &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::Transport {
            kind: TransportKind::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn cancellation_aborts_slow_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(success_response().set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = mailer(&server)
        .deliver(&valid_mail(), &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::Transport {
            kind: TransportKind::Cancelled,
            ..
        }
    ));
}
