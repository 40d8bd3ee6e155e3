//! SendGrid API provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use missive_relay::config::EnvSource;
//! use missive_relay::providers::{SendGridConfig, SendGridMailer};
//!
//! let config = SendGridConfig::build(&attributes, &EnvSource)?;
//! let mailer = SendGridMailer::new(config);
//! mailer.deliver(&attributes, &CancellationToken::new()).await?;
//! ```
//!
//! ## Configuration
//!
//! | Key | Used for |
//! |-----|----------|
//! | `SENDGRID_API_KEY` | Bearer token |
//! | `DEFAULT_FROM_ADDRESS` | Sender address when the request has no `from` |
//! | `DEFAULT_FROM_NAME` | Sender name when the request has no `fromName` |

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::SenderConfig;
use crate::attributes::MailAttributes;
use crate::config::{require, ConfigSource};
use crate::error::{MailError, SendError};
use crate::mailer::{cancellable, DeliveryResult, Mailer};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

/// Configuration key for the API key.
pub const SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";

/// SendGrid answers 202 Accepted with an empty body on success.
const ACCEPTED: StatusCode = StatusCode::ACCEPTED;

/// Everything the SendGrid mailer needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendGridConfig {
    pub api_key: String,
    pub sender: SenderConfig,
}

impl SendGridConfig {
    /// Resolve the configuration for one request.
    ///
    /// Fails with the first missing key; never returns a partial config.
    pub fn build(
        attributes: &MailAttributes,
        source: &dyn ConfigSource,
    ) -> Result<Self, MailError> {
        let api_key = require(source, SENDGRID_API_KEY)?;
        let sender = SenderConfig::build(attributes, source)?;
        Ok(Self { api_key, sender })
    }
}

/// SendGrid API email provider.
pub struct SendGridMailer {
    config: SendGridConfig,
    client: Client,
    base_url: String,
}

impl SendGridMailer {
    /// Create a new SendGrid mailer.
    pub fn new(config: SendGridConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(config: SendGridConfig, client: Client) -> Self {
        Self {
            config,
            client,
            base_url: SENDGRID_API_URL.to_string(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(&self, attributes: &MailAttributes) -> SendGridRequest {
        let to = attributes
            .recipients()
            .into_iter()
            .map(|email| SendGridAddress {
                email: email.to_string(),
                name: None,
            })
            .collect();

        SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to,
                subject: attributes.subject.clone(),
            }],
            from: SendGridAddress {
                email: self.config.sender.address.clone(),
                name: Some(self.config.sender.name.clone()),
            },
            subject: attributes.subject.clone(),
            content: vec![SendGridContent {
                content_type: "text/html",
                value: attributes.html_content.clone(),
            }],
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn deliver(
        &self,
        attributes: &MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DeliveryResult, SendError> {
        let provider = self.provider_name();
        let request = self.build_request(attributes);
        let url = format!("{}/mail/send", self.base_url);

        tracing::debug!(
            provider,
            recipients = request.personalizations[0].to.len(),
            "Sending request to SendGrid API"
        );

        cancellable(provider, cancel, async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .header("User-Agent", format!("missive-relay/{}", crate::VERSION))
                .json(&request)
                .send()
                .await
                .map_err(|e| SendError::from_reqwest(provider, e))?;

            let status = response.status();
            tracing::debug!(provider, status = status.as_u16(), "Received response");

            if status == ACCEPTED {
                let message_id = response
                    .headers()
                    .get("X-Message-Id")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                return Ok(message_id
                    .map(DeliveryResult::new)
                    .unwrap_or_else(DeliveryResult::generated));
            }

            let body = response
                .text()
                .await
                .map_err(|e| SendError::from_reqwest(provider, e))?;
            tracing::warn!(provider, status = status.as_u16(), body = %body, "API error");
            Err(SendError::rejected(provider, status.as_u16(), body))
        })
        .await
    }

    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }
}

// ============================================================================
// SendGrid API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<SendGridPersonalization>,
    from: SendGridAddress,
    subject: String,
    content: Vec<SendGridContent>,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization {
    to: Vec<SendGridAddress>,
    subject: String,
}

#[derive(Debug, Serialize)]
struct SendGridAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendGridContent {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}
