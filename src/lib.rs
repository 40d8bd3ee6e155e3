//! # missive-relay
//!
//! An HTTP mail relay. Each request is forwarded to exactly one outbound
//! provider, picked by a fixed priority from the enabled set.
//!
//! ## Quick Start
//!
//! ```bash
//! API_PORT=8080
//! IS_SENDGRID_ENABLED=true
//! SENDGRID_API_KEY=SG.xxxxx
//! DEFAULT_FROM_ADDRESS=noreply@example.com
//! DEFAULT_FROM_NAME="My App"
//! missive-relay
//! ```
//!
//! ```bash
//! curl -X POST localhost:8080/v1/sendmail \
//!   -H 'Content-Type: application/json' \
//!   -d '{"to":"a@example.com,b@example.com","subject":"Hi","content":"<p>Hello</p>"}'
//! ```
//!
//! ## Embedding the dispatcher
//!
//! ```rust,ignore
//! use missive_relay::{config::MapSource, Dispatcher, MailAttributes};
//! use tokio_util::sync::CancellationToken;
//!
//! let dispatcher = Dispatcher::new(MapSource::new().with("IS_NOOP_ENABLED", "true"));
//! let attrs = MailAttributes::new("user@example.com", "Hello", "<p>Hi</p>");
//! dispatcher.dispatch(attrs, &CancellationToken::new()).await?;
//! ```
//!
//! ## Provider priority
//!
//! Mailjet → SendGrid → Noop. When several flags are on the highest one wins
//! and a warning is logged. When none is on the request is echoed back
//! without sending anything.
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `API_PORT` | Listen port (required) |
//! | `API_HOST` | Listen address (default: `0.0.0.0`) |
//! | `MAIL_REQUEST_TIMEOUT_SECS` | Outbound provider timeout (default: 30) |
//! | `LOG_FORMAT` | `pretty` (default) or `json` |
//! | `IS_MAILJET_ENABLED` | `true` enables Mailjet |
//! | `IS_SENDGRID_ENABLED` | `true` enables SendGrid |
//! | `IS_NOOP_ENABLED` | `true` enables the logging-only provider |
//! | `DEFAULT_FROM_ADDRESS` | Sender address when the request has no `from` |
//! | `DEFAULT_FROM_NAME` | Sender name when the request has no `fromName` |
//! | `SENDGRID_API_KEY` | SendGrid API key |
//! | `SENDGRID_API_KEY_FILE` | File holding the SendGrid API key |
//! | `MAILJET_API_KEY_PUBLIC` | Mailjet public key |
//! | `MAILJET_API_KEY_PRIVATE` | Mailjet private key |
//!
//! ## Feature Flags
//!
//! - `server` (default) - axum HTTP surface, the `missive-relay` binary and
//!   [`testing::MockRelayServer`]
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `relay_dispatch_total` | Counter | provider, status | Dispatches that reached a provider |
//! | `relay_dispatch_duration_seconds` | Histogram | provider | Config + send duration |

/// The version of the missive-relay crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod attributes;
mod dispatch;
mod error;
mod mailer;

pub mod client;
pub mod config;
pub mod providers;
pub mod selector;

#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod settings;
#[cfg(feature = "server")]
pub mod testing;

pub use attributes::MailAttributes;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{MailError, SendError, TransportKind};
pub use mailer::{DeliveryResult, Mailer};
pub use selector::{ProviderEnablement, ProviderKind};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ConfigSource, EnvSource, MapSource};
    pub use crate::DeliveryResult;
    pub use crate::DispatchOutcome;
    pub use crate::Dispatcher;
    pub use crate::MailAttributes;
    pub use crate::MailError;
    pub use crate::Mailer;
    pub use crate::ProviderKind;
    pub use crate::SendError;
}
