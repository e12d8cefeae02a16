//! Error types for the Sonar client.

use thiserror::Error;

/// Result type for Sonar client operations.
pub type Result<T> = std::result::Result<T, SonarError>;

/// Sonar client errors.
#[derive(Debug, Error)]
pub enum SonarError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Parse error (request serialization, malformed stream event)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A 2xx body that is not a chat completion; the body is kept
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String, body: String },
}

impl SonarError {
    /// HTTP status of an API rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SonarError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
