//! Client for a running relay.
//!
//! ```rust,ignore
//! use missive_relay::client::RelayClient;
//! use missive_relay::MailAttributes;
//!
//! let client = RelayClient::new("http://localhost:8080")?;
//! client.health_check().await?;
//!
//! let mail = MailAttributes::new("user@example.com", "Hello", "<p>Hi</p>");
//! let echoed = client.send_mail(&mail).await?;
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::attributes::MailAttributes;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SEND_MAIL_PATH: &str = "/v1/sendmail";

/// Errors returned by [`RelayClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required field was empty; nothing was sent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-200 status.
    #[error("Relay error [{status}]: {message}")]
    Service { status: u16, message: String },

    /// The probe answered with a non-200 status.
    #[error("Relay unhealthy: status {0}")]
    Unhealthy(u16),

    /// A 200 response carried a body that is not a mail request.
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

/// HTTP client for the relay's `/v1/sendmail` endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: Client,
}

impl RelayClient {
    /// Create a client with the default 30 second timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder_client(DEFAULT_TIMEOUT).map(|client| Self::with_client(base_url, client))
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Replace the underlying client with one using `timeout`.
    pub fn timeout(self, timeout: Duration) -> Result<Self, ClientError> {
        let client = Self::builder_client(timeout)?;
        Ok(Self { client, ..self })
    }

    fn builder_client(timeout: Duration) -> Result<Client, ClientError> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one mail request and return the relay's echo.
    pub async fn send_mail(&self, attributes: &MailAttributes) -> Result<MailAttributes, ClientError> {
        if let Some(&field) = attributes.missing_fields().first() {
            return Err(ClientError::MissingField(field));
        }

        let url = format!("{}{}", self.base_url, SEND_MAIL_PATH);
        tracing::debug!(%url, to = %attributes.to, "Sending mail request to relay");

        let response = self.client.post(&url).json(attributes).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status != 200 {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            tracing::warn!(status, %message, "Relay rejected mail request");
            return Err(ClientError::Service { status, message });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Probe `GET {base}/`.
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ClientError::Unhealthy(status));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
