//! Boot-time settings and logging setup for the relay binary.

use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::{require, ConfigSource, EnvSource, LayeredSource, SecretFileSource};
use crate::error::MailError;
use crate::providers::SENDGRID_API_KEY;

pub const API_PORT: &str = "API_PORT";
pub const API_HOST: &str = "API_HOST";
pub const MAIL_REQUEST_TIMEOUT_SECS: &str = "MAIL_REQUEST_TIMEOUT_SECS";
pub const LOG_FORMAT: &str = "LOG_FORMAT";
/// Names the file holding the SendGrid API key.
pub const SENDGRID_API_KEY_FILE: &str = "SENDGRID_API_KEY_FILE";

/// Docker secret location used by older deployments.
pub const DEFAULT_SENDGRID_KEY_PATH: &str = "./run/secrets/sendgrid_api_key.txt";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub sendgrid_key_file: PathBuf,
}

impl Settings {
    /// Read settings; fails when `API_PORT` is missing or invalid.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, MailError> {
        let port = require(source, API_PORT)?;
        let port = port.trim().parse::<u16>().map_err(|e| {
            MailError::Configuration(format!("{} must be a port number, got {:?}: {}", API_PORT, port, e))
        })?;

        let host = source
            .get(API_HOST)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let request_timeout = match source.get(MAIL_REQUEST_TIMEOUT_SECS) {
            Some(secs) => {
                let secs = secs.trim().parse::<u64>().map_err(|e| {
                    MailError::Configuration(format!(
                        "{} must be a number of seconds: {}",
                        MAIL_REQUEST_TIMEOUT_SECS, e
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        let log_format = match source.get(LOG_FORMAT) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let sendgrid_key_file = source
            .get(SENDGRID_API_KEY_FILE)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDGRID_KEY_PATH));

        Ok(Self {
            host,
            port,
            request_timeout,
            log_format,
            sendgrid_key_file,
        })
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, MailError> {
        Self::from_source(&EnvSource)
    }

    /// Listen address as "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request-time configuration: environment first, then secret files.
    pub fn config_source(&self) -> LayeredSource {
        self.config_source_over(EnvSource)
    }

    /// Request-time configuration with `primary` in place of the environment.
    pub fn config_source_over(&self, primary: impl ConfigSource + 'static) -> LayeredSource {
        LayeredSource::new().layer(primary).layer(
            SecretFileSource::new().with_secret(SENDGRID_API_KEY, &self.sendgrid_key_file),
        )
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(filter)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
