//! Request dispatch: select, configure, send.
//!
//! ```rust,ignore
//! use missive_relay::{Dispatcher, MailAttributes};
//! use tokio_util::sync::CancellationToken;
//!
//! let dispatcher = Dispatcher::from_env();
//! let attrs = MailAttributes::new("user@example.com", "Hello", "<p>Hi</p>");
//! let outcome = dispatcher.dispatch(attrs, &CancellationToken::new()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "metrics")]
use std::time::Instant;

use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::attributes::MailAttributes;
use crate::config::{ConfigSource, EnvSource};
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::providers::{Endpoints, Provider};
use crate::selector::{ProviderEnablement, ProviderKind};

/// Successful end of a dispatch. Both variants echo the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// A provider accepted the message.
    Sent {
        provider: ProviderKind,
        delivery: DeliveryResult,
        attributes: MailAttributes,
    },
    /// No provider is enabled; nothing was sent.
    Skipped { attributes: MailAttributes },
}

impl DispatchOutcome {
    pub fn attributes(&self) -> &MailAttributes {
        match self {
            Self::Sent { attributes, .. } | Self::Skipped { attributes } => attributes,
        }
    }

    pub fn into_attributes(self) -> MailAttributes {
        match self {
            Self::Sent { attributes, .. } | Self::Skipped { attributes } => attributes,
        }
    }

    /// Provider that handled the message, if any.
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::Sent { provider, .. } => Some(*provider),
            Self::Skipped { .. } => None,
        }
    }
}

/// Entry point of the relay core.
///
/// Cheap to clone; clones share the configuration source and HTTP client.
#[derive(Clone)]
pub struct Dispatcher {
    source: Arc<dyn ConfigSource>,
    client: Client,
    endpoints: Endpoints,
}

impl Dispatcher {
    /// Create a dispatcher reading configuration from `source`.
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            client: Client::new(),
            endpoints: Endpoints::default(),
        }
    }

    /// Dispatcher over the process environment.
    pub fn from_env() -> Self {
        Self::new(EnvSource)
    }

    /// Use a custom reqwest client for provider calls.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build the provider client with a request timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(self.with_client(client))
    }

    /// Override provider base URLs (for testing).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn source(&self) -> &dyn ConfigSource {
        self.source.as_ref()
    }

    /// Read the current flags and pick a provider, warning when several are on.
    pub fn select(&self) -> Option<ProviderKind> {
        let flags = ProviderEnablement::from_source(self.source());
        let count = flags.enabled_count();
        if count > 1 {
            tracing::warn!(
                enabled = count,
                "multiple mail providers are enabled ({}) - only one will be used based on priority: Mailjet → SendGrid → Noop",
                count
            );
        }
        flags.select()
    }

    /// Dispatch one validated request.
    ///
    /// Attributes are not re-validated here. Every failure aborts the
    /// dispatch; nothing is retried and no other provider is tried.
    pub async fn dispatch(
        &self,
        attributes: MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, MailError> {
        let Some(kind) = self.select() else {
            tracing::warn!("no mail provider is enabled - mail not sent");
            return Ok(DispatchOutcome::Skipped { attributes });
        };

        let span = tracing::info_span!(
            "relay.dispatch",
            provider = kind.as_str(),
            recipients = attributes.recipients().len(),
            subject = %attributes.subject,
        );

        async move {
            tracing::info!(priority = kind.priority_label(), "using {} provider", kind);

            #[cfg(feature = "metrics")]
            let start = Instant::now();

            let result = self.send_with(kind, &attributes, cancel).await;

            #[cfg(feature = "metrics")]
            {
                let duration = start.elapsed().as_secs_f64();
                let status = if result.is_ok() { "success" } else { "error" };
                metrics::counter!("relay_dispatch_total", "provider" => kind.as_str(), "status" => status)
                    .increment(1);
                metrics::histogram!("relay_dispatch_duration_seconds", "provider" => kind.as_str())
                    .record(duration);
            }

            match result {
                Ok(delivery) => {
                    tracing::info!(message_id = %delivery.message_id, "mail handled by {} provider", kind);
                    Ok(DispatchOutcome::Sent {
                        provider: kind,
                        delivery,
                        attributes,
                    })
                }
                Err(e) => {
                    tracing::error!(error = %e, "{} provider failed", kind);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn send_with(
        &self,
        kind: ProviderKind,
        attributes: &MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DeliveryResult, MailError> {
        let provider = Provider::build(
            kind,
            attributes,
            self.source(),
            &self.client,
            &self.endpoints,
        )?;
        Ok(provider.deliver(attributes, cancel).await?)
    }
}
