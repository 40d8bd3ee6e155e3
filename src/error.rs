//! Error types for missive-relay.

use std::fmt;

use thiserror::Error;

/// Errors that abort a dispatch.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// A required configuration field was neither supplied by the caller
    /// nor present in the configuration source. Holds the fallback key.
    #[error("Missing configuration: {0} not found")]
    ConfigMissing(String),

    /// Invalid configuration value (bad port, unparsable timeout, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The HTTP listener could not be bound or failed while serving.
    #[error("Server error: {0}")]
    Server(String),

    /// The selected provider failed to send.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl MailError {
    /// Key named by a [`MailError::ConfigMissing`], if that is what this is.
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            Self::ConfigMissing(key) => Some(key),
            _ => None,
        }
    }
}

/// Why an outbound call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Could not connect or the request could not be written.
    Connect,
    /// The request timed out.
    Timeout,
    /// The caller cancelled the request.
    Cancelled,
    /// The response body could not be read or decoded.
    Body,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Body => "body",
        };
        f.write_str(s)
    }
}

/// Normalized failure of a single provider call.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The outbound call could not be completed.
    #[error("Transport error ({provider}, {kind}): {message}")]
    Transport {
        provider: &'static str,
        kind: TransportKind,
        message: String,
    },

    /// The provider explicitly declined the message.
    #[error("Provider rejected message ({provider}) [{status}]{}: {message}", code_suffix(.code))]
    Rejected {
        provider: &'static str,
        /// HTTP status of the provider response
        status: u16,
        /// Provider error code embedded in an otherwise successful response
        code: Option<String>,
        /// Response body, or the embedded error message
        message: String,
    },
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

impl SendError {
    /// Create a transport error.
    pub fn transport(
        provider: &'static str,
        kind: TransportKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            provider,
            kind,
            message: message.into(),
        }
    }

    /// Create a transport error for a cancelled call.
    pub fn cancelled(provider: &'static str) -> Self {
        Self::transport(provider, TransportKind::Cancelled, "request cancelled by caller")
    }

    /// Create a rejection from a non-accepted status code and its body.
    pub fn rejected(provider: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            provider,
            status,
            code: None,
            message: body.into(),
        }
    }

    /// Create a rejection from an error embedded in a success response.
    pub fn rejected_with_code(
        provider: &'static str,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            provider,
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Classify a reqwest failure into a transport error.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Connect
        };
        Self::transport(provider, kind, err.to_string())
    }

    /// Name of the provider that produced the error.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transport { provider, .. } | Self::Rejected { provider, .. } => provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_names_key() {
        let err = MailError::ConfigMissing("SENDGRID_API_KEY".into());
        assert_eq!(err.missing_key(), Some("SENDGRID_API_KEY"));
        assert!(err.to_string().contains("SENDGRID_API_KEY"));
    }

    #[test]
    fn test_rejected_display_with_and_without_code() {
        let err = SendError::rejected("sendgrid", 400, "bad request");
        assert_eq!(
            err.to_string(),
            "Provider rejected message (sendgrid) [400]: bad request"
        );

        let err = SendError::rejected_with_code("mailjet", 200, "mj-0013", "invalid email");
        assert_eq!(
            err.to_string(),
            "Provider rejected message (mailjet) [200] (mj-0013): invalid email"
        );
    }

    #[test]
    fn test_send_error_is_transparent_in_mail_error() {
        let err: MailError = SendError::cancelled("mailjet").into();
        assert!(err.to_string().contains("cancelled"));
        assert!(err.missing_key().is_none());
    }
}
