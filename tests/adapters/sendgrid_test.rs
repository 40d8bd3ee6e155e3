//! SendGrid adapter tests.

use std::time::Duration;

use missive_relay::providers::{SendGridConfig, SendGridMailer, SenderConfig};
use missive_relay::{MailAttributes, Mailer, SendError, TransportKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn config() -> SendGridConfig {
    SendGridConfig {
        api_key: "SG.test-api-key".into(),
        sender: SenderConfig {
            address: "tony.stark@example.com".into(),
            name: "Tony Stark".into(),
        },
    }
}

fn valid_mail() -> MailAttributes {
    MailAttributes::new(
        "steve.rogers@example.com, bruce.banner@example.com",
        "Hello, Avengers!",
        "<h1>Hello</h1>",
    )
}

fn mailer(server: &MockServer) -> SendGridMailer {
    SendGridMailer::new(config()).base_url(server.uri())
}

// ============================================================================
// Basic Delivery Tests
// ============================================================================

#[tokio::test]
async fn successful_delivery_returns_message_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(header("Authorization", "Bearer SG.test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "personalizations": [{
                "to": [
                    {"email": "steve.rogers@example.com"},
                    {"email": "bruce.banner@example.com"}
                ],
                "subject": "Hello, Avengers!"
            }],
            "from": {"email": "tony.stark@example.com", "name": "Tony Stark"},
            "subject": "Hello, Avengers!",
            "content": [{"type": "text/html", "value": "<h1>Hello</h1>"}]
        })))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "123-xyz"))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(delivery.message_id, "123-xyz");
}

#[tokio::test]
async fn accepted_without_message_id_generates_one() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(202))
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
async fn ok_status_other_than_accepted_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unexpected"))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SendError::Rejected { status: 200, .. }));
}

#[tokio::test]
async fn bad_request_is_rejected_with_body() {
    let server = MockServer::start().await;
    let body = r#"{"errors":[{"message":"The from email does not contain a valid address."}]}"#;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
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
            assert_eq!(provider, "sendgrid");
            assert_eq!(status, 400);
            assert!(code.is_none());
            assert_eq!(message, body);
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server)
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SendError::Rejected { status: 500, .. }));
    assert!(err.to_string().contains("Internal Server Error"));
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let mailer = SendGridMailer::new(config()).base_url("http://127.0.0.1:1");

    let err = mailer
        .deliver(&valid_mail(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SendError::Transport {
            kind: TransportKind::Connect,
            ..
        }
    ));
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn cancellation_aborts_slow_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(30)))
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

#[tokio::test]
async fn provider_name_is_sendgrid() {
    assert_eq!(SendGridMailer::new(config()).provider_name(), "sendgrid");
}
