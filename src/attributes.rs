//! Inbound mail request.

use serde::{Deserialize, Deserializer, Serialize};

/// A mail-send request as received over HTTP.
///
/// ```
/// use missive_relay::MailAttributes;
///
/// let attrs = MailAttributes::new(" a@x.com, ,b@x.com ", "Hello", "<p>Hi</p>");
/// assert_eq!(attrs.recipients(), vec!["a@x.com", "b@x.com"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAttributes {
    /// Comma-separated recipients. A JSON array of strings is accepted too.
    #[serde(default, deserialize_with = "recipients_from_string_or_list")]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    /// HTML body
    #[serde(rename = "content", default)]
    pub html_content: String,
    /// Sender address; falls back to `DEFAULT_FROM_ADDRESS` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// Sender display name; falls back to `DEFAULT_FROM_NAME` when empty.
    #[serde(rename = "fromName", default, skip_serializing_if = "String::is_empty")]
    pub from_name: String,
}

impl MailAttributes {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_content: html_content.into(),
            ..Self::default()
        }
    }

    /// Set the sender address.
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = address.into();
        self
    }

    /// Set the sender display name.
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = name.into();
        self
    }

    /// Recipients in input order, trimmed, with empty segments dropped.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Names of the required fields that are missing.
    ///
    /// `subject` and `content` only need to be non-empty. `to` must hold at
    /// least one recipient after splitting.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recipients().is_empty() {
            missing.push("to");
        }
        if self.subject.is_empty() {
            missing.push("subject");
        }
        if self.html_content.is_empty() {
            missing.push("content");
        }
        missing
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

fn recipients_from_string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Recipients::deserialize(deserializer)? {
        Recipients::One(s) => s,
        Recipients::Many(list) => list.join(","),
    })
}
