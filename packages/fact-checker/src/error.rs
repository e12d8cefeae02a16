//! Typed errors for the fact-checking pipeline.
//!
//! Every variant is terminal for an invocation; the binary maps each one to
//! a distinct exit code via [`FactCheckError::exit_code`].

use sonar_client::SonarError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FactCheckError>;

/// Why a structured answer failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Not a JSON document at all
    InvalidJson,
    /// Valid JSON that does not match the verdict schema
    SchemaMismatch,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::InvalidJson => f.write_str("invalid JSON"),
            ParseErrorKind::SchemaMismatch => f.write_str("schema mismatch"),
        }
    }
}

/// Errors that can occur while verifying claims.
#[derive(Debug, Error)]
pub enum FactCheckError {
    /// Bad, missing or conflicting command-line arguments
    #[error("usage error: {0}")]
    Usage(String),

    /// No resolvable API key or an invalid configuration value
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable file, failed URL fetch or empty extraction
    #[error("input error: {0}")]
    Input(String),

    /// Transport-level failure reaching the Sonar endpoint
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with an error status
    #[error("upstream error (HTTP {status}): {body}")]
    Upstream { status: u16, body: String },

    /// The answer did not conform to the verdict schema
    #[error("parse error ({kind}): {message}")]
    Parse {
        kind: ParseErrorKind,
        message: String,
        raw: String,
    },
}

impl FactCheckError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            FactCheckError::Usage(_) => 2,
            FactCheckError::Configuration(_) => 3,
            FactCheckError::Input(_) => 4,
            FactCheckError::Network(_) => 5,
            FactCheckError::Upstream { .. } => 6,
            FactCheckError::Parse { .. } => 7,
        }
    }

    /// The model's raw answer, for parse failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            FactCheckError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<SonarError> for FactCheckError {
    fn from(err: SonarError) -> Self {
        match err {
            SonarError::Config(msg) => FactCheckError::Configuration(msg),
            SonarError::Network(msg) => FactCheckError::Network(msg),
            SonarError::Api { status, body } => FactCheckError::Upstream { status, body },
            SonarError::Parse(msg) => FactCheckError::Parse {
                kind: ParseErrorKind::InvalidJson,
                message: msg,
                raw: String::new(),
            },
            // The endpoint answered but the envelope was not a chat completion
            SonarError::InvalidResponse { message, body } => FactCheckError::Parse {
                kind: ParseErrorKind::InvalidJson,
                message,
                raw: body,
            },
        }
    }
}
