//! Noop mailer that only logs.
//!
//! Used for local development and tests: nothing leaves the process, but a
//! tracing event records what would have been sent.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::attributes::MailAttributes;
use crate::error::SendError;
use crate::mailer::{DeliveryResult, Mailer};

/// Mailer that emits tracing events instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailer;

impl NoopMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for NoopMailer {
    async fn deliver(
        &self,
        attributes: &MailAttributes,
        _cancel: &CancellationToken,
    ) -> Result<DeliveryResult, SendError> {
        let delivery = DeliveryResult::generated();

        tracing::info!(
            message_id = %delivery.message_id,
            to = ?attributes.recipients(),
            subject = %attributes.subject,
            from = %attributes.from,
            from_name = %attributes.from_name,
            html_bytes = attributes.html_content.len(),
            "Mail processed by noop provider (not sent)"
        );
        tracing::debug!(body = %attributes.html_content, "HTML body");

        Ok(delivery)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        let mailer = NoopMailer::new();
        let attrs = MailAttributes::new("a@x.com,b@x.com", "S", "<p>C</p>");

        let delivery = mailer
            .deliver(&attrs, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!delivery.message_id.is_empty());
    }

    #[tokio::test]
    async fn test_noop_ignores_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let attrs = MailAttributes::new("a@x.com", "S", "C");
        assert!(NoopMailer.deliver(&attrs, &token).await.is_ok());
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(NoopMailer::new().provider_name(), "noop");
    }
}
