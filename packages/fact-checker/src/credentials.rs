//! The resolved Perplexity API key and where it came from.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;

/// Which configuration layer supplied the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Env(&'static str),
    File(PathBuf),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Flag => f.write_str("--api-key flag"),
            KeySource::Env(name) => write!(f, "{} environment variable", name),
            KeySource::File(path) => write!(f, "key file {}", path.display()),
        }
    }
}

/// API key held in a [`SecretString`]. Formatting shows the source only.
pub struct ApiKey {
    secret: SecretString,
    source: KeySource,
}

impl ApiKey {
    /// Key text is trimmed; callers reject blank values before this point.
    pub fn new(key: &str, source: KeySource) -> Self {
        Self {
            secret: SecretString::from(key.trim().to_owned()),
            source,
        }
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Key text for the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.source.clone())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("secret", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}
