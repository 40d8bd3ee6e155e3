//! Mailjet API provider.
//!
//! For reference: [Mailjet API docs](https://dev.mailjet.com/guides/#send-api-v3-1)
//!
//! # Example
//!
//! ```rust,ignore
//! use missive_relay::config::EnvSource;
//! use missive_relay::providers::{MailjetConfig, MailjetMailer};
//!
//! let config = MailjetConfig::build(&attributes, &EnvSource)?;
//! let mailer = MailjetMailer::new(config);
//! ```
//!
//! ## Configuration
//!
//! | Key | Used for |
//! |-----|----------|
//! | `MAILJET_API_KEY_PUBLIC` | Basic auth user |
//! | `MAILJET_API_KEY_PRIVATE` | Basic auth password |
//! | `DEFAULT_FROM_ADDRESS` | Sender address when the request has no `from` |
//! | `DEFAULT_FROM_NAME` | Sender name when the request has no `fromName` |
//!
//! ## Errors
//!
//! Mailjet can answer 200 while refusing the message; the per-message
//! `Status` is `"error"` and `Errors` carries the reason. That case is
//! reported as [`SendError::Rejected`] with the first error's code.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::SenderConfig;
use crate::attributes::MailAttributes;
use crate::config::{require, ConfigSource};
use crate::error::{MailError, SendError, TransportKind};
use crate::mailer::{cancellable, DeliveryResult, Mailer};

const MAILJET_API_URL: &str = "https://api.mailjet.com/v3.1";

/// Configuration key for the public API key.
pub const MAILJET_API_KEY_PUBLIC: &str = "MAILJET_API_KEY_PUBLIC";
/// Configuration key for the private API key.
pub const MAILJET_API_KEY_PRIVATE: &str = "MAILJET_API_KEY_PRIVATE";

const ACCEPTED: StatusCode = StatusCode::OK;

/// Everything the Mailjet mailer needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailjetConfig {
    pub api_key_public: String,
    pub api_key_private: String,
    pub sender: SenderConfig,
}

impl MailjetConfig {
    /// Resolve the configuration for one request.
    ///
    /// Fails with the first missing key; never returns a partial config.
    pub fn build(
        attributes: &MailAttributes,
        source: &dyn ConfigSource,
    ) -> Result<Self, MailError> {
        let api_key_public = require(source, MAILJET_API_KEY_PUBLIC)?;
        let api_key_private = require(source, MAILJET_API_KEY_PRIVATE)?;
        let sender = SenderConfig::build(attributes, source)?;
        Ok(Self {
            api_key_public,
            api_key_private,
            sender,
        })
    }
}

/// Mailjet API email provider.
pub struct MailjetMailer {
    config: MailjetConfig,
    client: Client,
    base_url: String,
}

impl MailjetMailer {
    /// Create a new Mailjet mailer.
    pub fn new(config: MailjetConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(config: MailjetConfig, client: Client) -> Self {
        Self {
            config,
            client,
            base_url: MAILJET_API_URL.to_string(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn auth_header(&self) -> String {
        let credentials = format!(
            "{}:{}",
            self.config.api_key_public, self.config.api_key_private
        );
        format!("Basic {}", BASE64.encode(credentials.as_bytes()))
    }

    fn build_message(&self, attributes: &MailAttributes) -> MailjetMessage {
        MailjetMessage {
            from: MailjetAddress {
                email: self.config.sender.address.clone(),
                name: Some(self.config.sender.name.clone()),
            },
            to: attributes
                .recipients()
                .into_iter()
                .map(|email| MailjetAddress {
                    email: email.to_string(),
                    name: None,
                })
                .collect(),
            subject: attributes.subject.clone(),
            html_part: attributes.html_content.clone(),
        }
    }

    /// Turn a 200 response body into a delivery or an embedded rejection.
    fn interpret(&self, status: StatusCode, body: &str) -> Result<DeliveryResult, SendError> {
        let provider = self.provider_name();
        let parsed: MailjetResponse = serde_json::from_str(body).map_err(|e| {
            SendError::transport(
                provider,
                TransportKind::Body,
                format!("failed to parse response: {}", e),
            )
        })?;

        let Some(msg) = parsed.messages.first() else {
            return Ok(DeliveryResult::generated());
        };
        tracing::debug!(provider, status = %msg.status, "Message status");

        if msg.status == "error" {
            if let Some(first) = msg.errors.first() {
                tracing::warn!(
                    provider,
                    identifier = %first.error_identifier,
                    code = %first.error_code,
                    message = %first.error_message,
                    "Message refused"
                );
                return Err(SendError::rejected_with_code(
                    provider,
                    status.as_u16(),
                    first.error_code.clone(),
                    first.error_message.clone(),
                ));
            }
        }

        for recipient in &msg.to {
            tracing::debug!(
                provider,
                message_id = ?recipient.message_id,
                message_uuid = ?recipient.message_uuid,
                "Recipient accepted"
            );
        }

        Ok(msg
            .to
            .first()
            .and_then(|t| t.message_id)
            .map(|id| DeliveryResult::new(id.to_string()))
            .unwrap_or_else(DeliveryResult::generated))
    }
}

#[async_trait]
impl Mailer for MailjetMailer {
    async fn deliver(
        &self,
        attributes: &MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DeliveryResult, SendError> {
        let provider = self.provider_name();
        let request = MailjetRequest {
            messages: vec![self.build_message(attributes)],
        };
        let url = format!("{}/send", self.base_url);

        tracing::debug!(
            provider,
            recipients = request.messages[0].to.len(),
            "Sending request to Mailjet API"
        );

        cancellable(provider, cancel, async {
            let response = self
                .client
                .post(&url)
                .header("Authorization", self.auth_header())
                .header("User-Agent", format!("missive-relay/{}", crate::VERSION))
                .json(&request)
                .send()
                .await
                .map_err(|e| SendError::from_reqwest(provider, e))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| SendError::from_reqwest(provider, e))?;
            tracing::debug!(provider, status = status.as_u16(), "Received response");

            if status != ACCEPTED {
                tracing::warn!(provider, status = status.as_u16(), body = %body, "API error");
                return Err(SendError::rejected(provider, status.as_u16(), body));
            }

            self.interpret(status, &body)
        })
        .await
    }

    fn provider_name(&self) -> &'static str {
        "mailjet"
    }
}

// ============================================================================
// Mailjet API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetRequest {
    messages: Vec<MailjetMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetMessage {
    from: MailjetAddress,
    to: Vec<MailjetAddress>,
    subject: String,
    #[serde(rename = "HTMLPart")]
    html_part: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetResponse {
    #[serde(default)]
    messages: Vec<MailjetMessageResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetMessageResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    to: Vec<MailjetRecipientResult>,
    #[serde(default)]
    errors: Vec<MailjetError>,
}

#[derive(Debug, Deserialize)]
struct MailjetRecipientResult {
    #[serde(rename = "MessageID")]
    message_id: Option<i64>,
    #[serde(rename = "MessageUUID")]
    message_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetError {
    #[serde(default)]
    error_identifier: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}
