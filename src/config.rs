//! Configuration sources and field resolution.
//!
//! Every configuration lookup goes through a [`ConfigSource`] handle rather
//! than reading the process environment directly. The server builds one
//! source at startup and shares it between requests; tests use [`MapSource`].
//!
//! ```
//! use missive_relay::config::{resolve, MapSource};
//!
//! let source = MapSource::new().with("DEFAULT_FROM_NAME", "Relay");
//!
//! // Explicit values win.
//! assert_eq!(resolve(&source, "Alice", "DEFAULT_FROM_NAME").unwrap(), "Alice");
//! // Empty explicit values fall back to the source.
//! assert_eq!(resolve(&source, "", "DEFAULT_FROM_NAME").unwrap(), "Relay");
//! ```

use std::collections::HashMap;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::MailError;

/// Sender address fallback, shared by all providers.
pub const DEFAULT_FROM_ADDRESS: &str = "DEFAULT_FROM_ADDRESS";
/// Sender display name fallback, shared by all providers.
pub const DEFAULT_FROM_NAME: &str = "DEFAULT_FROM_NAME";

/// Read-only key/value lookup.
pub trait ConfigSource: Send + Sync {
    /// Return the value for `key`, or `None` if the source has no entry.
    fn get(&self, key: &str) -> Option<String>;
}

impl<S: ConfigSource + ?Sized> ConfigSource for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Resolve one configuration field.
///
/// A non-empty `explicit` value is returned unchanged without consulting the
/// source. Otherwise `fallback_key` is looked up, failing with
/// [`MailError::ConfigMissing`] when absent. An empty value in the source
/// counts as absent, so a resolved field is never empty.
pub fn resolve(
    source: &dyn ConfigSource,
    explicit: &str,
    fallback_key: &str,
) -> Result<String, MailError> {
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }
    source
        .get(fallback_key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MailError::ConfigMissing(fallback_key.to_string()))
}

/// Resolve a field that has no caller-supplied value.
pub fn require(source: &dyn ConfigSource, key: &str) -> Result<String, MailError> {
    resolve(source, "", key)
}

// ============================================================================
// Sources
// ============================================================================

/// Process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// In-memory source.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Secrets mounted as files (Docker/Kubernetes style).
///
/// Each registered key maps to a file path. The value is the file content
/// with one trailing newline stripped.
#[derive(Debug, Clone, Default)]
pub struct SecretFileSource {
    files: HashMap<String, PathBuf>,
}

impl SecretFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the file holding the secret for `key`.
    pub fn with_secret(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(key.into(), path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ConfigSource for SecretFileSource {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.files.get(key)?;
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = %e, "Could not open secret file");
                return None;
            }
        };
        match read_secret(file) {
            Ok(secret) => Some(secret),
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = %e, "Could not read secret file");
                None
            }
        }
    }
}

/// Read a secret, stripping one trailing newline.
///
/// Inner newlines are kept verbatim. An empty reader yields an empty string.
pub fn read_secret(mut reader: impl Read) -> io::Result<String> {
    let mut secret = String::new();
    reader.read_to_string(&mut secret)?;
    if secret.ends_with('\n') {
        secret.pop();
        if secret.ends_with('\r') {
            secret.pop();
        }
    }
    Ok(secret)
}

/// Ordered stack of sources; the first one holding a non-empty value wins.
///
/// An empty value (e.g. `SENDGRID_API_KEY=` in a compose file) falls through
/// to the next layer.
#[derive(Clone, Default)]
pub struct LayeredSource {
    layers: Vec<Arc<dyn ConfigSource>>,
}

impl LayeredSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    pub fn layer(mut self, source: impl ConfigSource + 'static) -> Self {
        self.layers.push(Arc::new(source));
        self
    }
}

impl ConfigSource for LayeredSource {
    fn get(&self, key: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get(key).filter(|value| !value.is_empty()))
    }
}
