//! Provider enablement flags and priority selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigSource;

/// Flag enabling the Noop provider.
pub const IS_NOOP_ENABLED: &str = "IS_NOOP_ENABLED";
/// Flag enabling the SendGrid provider.
pub const IS_SENDGRID_ENABLED: &str = "IS_SENDGRID_ENABLED";
/// Flag enabling the Mailjet provider.
pub const IS_MAILJET_ENABLED: &str = "IS_MAILJET_ENABLED";

/// The closed set of providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Noop,
    SendGrid,
    Mailjet,
}

impl ProviderKind {
    /// All providers, highest priority first.
    pub const BY_PRIORITY: [ProviderKind; 3] =
        [ProviderKind::Mailjet, ProviderKind::SendGrid, ProviderKind::Noop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::SendGrid => "sendgrid",
            Self::Mailjet => "mailjet",
        }
    }

    /// Human-readable priority label for logs.
    pub fn priority_label(&self) -> &'static str {
        match self {
            Self::Mailjet => "highest",
            Self::SendGrid => "medium",
            Self::Noop => "lowest - development/testing only",
        }
    }

    /// Configuration key of this provider's enablement flag.
    pub fn flag_key(&self) -> &'static str {
        match self {
            Self::Noop => IS_NOOP_ENABLED,
            Self::SendGrid => IS_SENDGRID_ENABLED,
            Self::Mailjet => IS_MAILJET_ENABLED,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the enablement flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderEnablement {
    pub noop: bool,
    pub sendgrid: bool,
    pub mailjet: bool,
}

impl ProviderEnablement {
    /// Read the flags from a configuration source.
    ///
    /// A flag is on when its value is `"true"` in any case. Missing keys and
    /// any other value read as off.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let flag = |kind: ProviderKind| {
            source
                .get(kind.flag_key())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        };
        Self {
            noop: flag(ProviderKind::Noop),
            sendgrid: flag(ProviderKind::SendGrid),
            mailjet: flag(ProviderKind::Mailjet),
        }
    }

    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Noop => self.noop,
            ProviderKind::SendGrid => self.sendgrid,
            ProviderKind::Mailjet => self.mailjet,
        }
    }

    /// Number of enabled providers.
    pub fn enabled_count(&self) -> usize {
        ProviderKind::BY_PRIORITY
            .iter()
            .filter(|kind| self.is_enabled(**kind))
            .count()
    }

    /// Pick the highest-priority enabled provider.
    ///
    /// Mailjet beats SendGrid beats Noop. `None` means nothing is enabled.
    pub fn select(&self) -> Option<ProviderKind> {
        ProviderKind::BY_PRIORITY
            .into_iter()
            .find(|kind| self.is_enabled(*kind))
    }
}
