//! Email provider implementations.
//!
//! Each provider implements the [`Mailer`] trait.
//!
//! ## Available Providers
//!
//! | Provider | Kind | Priority | Description |
//! |----------|------|----------|-------------|
//! | [`MailjetMailer`] | `mailjet` | highest | Mailjet Send API v3.1 |
//! | [`SendGridMailer`] | `sendgrid` | medium | SendGrid v3 mail/send |
//! | [`NoopMailer`] | `noop` | lowest | Logs, never sends (development/testing) |

mod mailjet;
mod noop;
mod sendgrid;

pub use mailjet::{MailjetConfig, MailjetMailer, MAILJET_API_KEY_PRIVATE, MAILJET_API_KEY_PUBLIC};
pub use noop::NoopMailer;
pub use sendgrid::{SendGridConfig, SendGridMailer, SENDGRID_API_KEY};

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::attributes::MailAttributes;
use crate::config::{resolve, ConfigSource, DEFAULT_FROM_ADDRESS, DEFAULT_FROM_NAME};
use crate::error::{MailError, SendError};
use crate::mailer::{DeliveryResult, Mailer};
use crate::selector::ProviderKind;

/// Sender identity shared by every provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    pub address: String,
    pub name: String,
}

impl SenderConfig {
    /// Request values first, then `DEFAULT_FROM_ADDRESS` / `DEFAULT_FROM_NAME`.
    pub fn build(
        attributes: &MailAttributes,
        source: &dyn ConfigSource,
    ) -> Result<Self, MailError> {
        let address = resolve(source, &attributes.from, DEFAULT_FROM_ADDRESS)?;
        let name = resolve(source, &attributes.from_name, DEFAULT_FROM_NAME)?;
        Ok(Self { address, name })
    }
}

/// Base URL overrides, mostly for pointing providers at mock servers.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub sendgrid: Option<String>,
    pub mailjet: Option<String>,
}

/// A configured provider, ready to send one message.
pub enum Provider {
    Noop(NoopMailer),
    SendGrid(SendGridMailer),
    Mailjet(MailjetMailer),
}

impl Provider {
    /// Build the provider for `kind`, resolving its configuration.
    ///
    /// No network access happens here.
    pub fn build(
        kind: ProviderKind,
        attributes: &MailAttributes,
        source: &dyn ConfigSource,
        client: &Client,
        endpoints: &Endpoints,
    ) -> Result<Self, MailError> {
        Ok(match kind {
            ProviderKind::Noop => Self::Noop(NoopMailer::new()),
            ProviderKind::SendGrid => {
                let config = SendGridConfig::build(attributes, source)?;
                let mut mailer = SendGridMailer::with_client(config, client.clone());
                if let Some(url) = &endpoints.sendgrid {
                    mailer = mailer.base_url(url.clone());
                }
                Self::SendGrid(mailer)
            }
            ProviderKind::Mailjet => {
                let config = MailjetConfig::build(attributes, source)?;
                let mut mailer = MailjetMailer::with_client(config, client.clone());
                if let Some(url) = &endpoints.mailjet {
                    mailer = mailer.base_url(url.clone());
                }
                Self::Mailjet(mailer)
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Noop(_) => ProviderKind::Noop,
            Self::SendGrid(_) => ProviderKind::SendGrid,
            Self::Mailjet(_) => ProviderKind::Mailjet,
        }
    }
}

#[async_trait]
impl Mailer for Provider {
    async fn deliver(
        &self,
        attributes: &MailAttributes,
        cancel: &CancellationToken,
    ) -> Result<DeliveryResult, SendError> {
        match self {
            Self::Noop(m) => m.deliver(attributes, cancel).await,
            Self::SendGrid(m) => m.deliver(attributes, cancel).await,
            Self::Mailjet(m) => m.deliver(attributes, cancel).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Noop(m) => m.provider_name(),
            Self::SendGrid(m) => m.provider_name(),
            Self::Mailjet(m) => m.provider_name(),
        }
    }
}
