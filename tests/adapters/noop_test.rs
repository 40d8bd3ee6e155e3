//! Noop adapter tests.

use missive_relay::providers::NoopMailer;
use missive_relay::{MailAttributes, Mailer};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn deliver_returns_ok() {
    let mail = MailAttributes::new("steve.rogers@example.com", "Hello, Avengers!", "<h1>Hello!</h1>");

    let delivery = NoopMailer::new()
        .deliver(&mail, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!delivery.message_id.is_empty());
}

#[tokio::test]
async fn deliver_with_sender_fields_returns_ok() {
    let mail = MailAttributes::new(
        "steve.rogers@example.com,bruce.banner@example.com",
        "Hello, Avengers!",
        "<h1>Hello!</h1>",
    )
    .from("tony.stark@example.com")
    .from_name("Tony Stark");

    assert!(NoopMailer::new()
        .deliver(&mail, &CancellationToken::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn each_delivery_gets_a_distinct_id() {
    let mail = MailAttributes::new("a@example.com", "S", "C");
    let token = CancellationToken::new();

    let first = NoopMailer::new().deliver(&mail, &token).await.unwrap();
    let second = NoopMailer::new().deliver(&mail, &token).await.unwrap();
    assert_ne!(first.message_id, second.message_id);
}
