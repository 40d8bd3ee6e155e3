//! Mailer trait and delivery result types.
//!
//! Every provider implements [`Mailer`]. The set of providers is closed, so
//! the dispatcher holds them in the [`Provider`](crate::providers::Provider)
//! enum and matches on it instead of boxing `dyn Mailer`.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::attributes::MailAttributes;
use crate::error::SendError;

/// Result of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the provider (generated when it reports none)
    pub message_id: String,
}

impl DeliveryResult {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }

    /// Delivery result with a locally generated message ID.
    pub fn generated() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Uniform send contract.
///
/// Implementations make at most one outbound call per `deliver` and never
/// retry. Cancelling `cancel` aborts the call with a
/// [`TransportKind::Cancelled`](crate::TransportKind::Cancelled) error.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message.
    async fn deliver(
        &self,
        attributes: &MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DeliveryResult, SendError>;

    /// Get the provider name (for logging/errors).
    fn provider_name(&self) -> &'static str;
}

/// Run an outbound call unless `cancel` fires first.
///
/// The call future is dropped on cancellation, which aborts the request.
pub(crate) async fn cancellable<T, F>(
    provider: &'static str,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, SendError>
where
    F: Future<Output = Result<T, SendError>>,
{
    if cancel.is_cancelled() {
        return Err(SendError::cancelled(provider));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!(provider, "Outbound call cancelled");
            Err(SendError::cancelled(provider))
        }
        result = call => result,
    }
}
