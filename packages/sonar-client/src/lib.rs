//! Pure Perplexity Sonar REST API client
//!
//! A minimal client for the Sonar chat-completions endpoint with no
//! domain-specific logic. Supports plain completions (with the web citations
//! Sonar returns), structured outputs constrained by a JSON schema, SSE
//! streaming, and a typed tool capability interface.
//!
//! # Example
//!
//! ```rust,ignore
//! use sonar_client::{ChatApi, ChatRequest, Message, SonarClient};
//!
//! let client = SonarClient::from_env()?;
//!
//! let response = client.chat_completion(
//!     ChatRequest::new("sonar-pro")
//!         .message(Message::system("Be precise and concise."))
//!         .message(Message::user("What is the boiling point of water at altitude?")),
//! ).await?;
//!
//! println!("{}", response.content);
//! for url in &response.citations {
//!     println!("  - {}", url);
//! }
//! ```
//!
//! # Structured Output
//!
//! ```rust,ignore
//! use sonar_client::StructuredOutput;
//!
//! let request = ChatRequest::new("sonar-pro")
//!     .message(Message::user(prompt))
//!     .json_schema(Answer::sonar_schema());
//! ```
//!
//! Structured outputs are only available on some account tiers. The client
//! does not check eligibility; a rejection comes back as [`SonarError::Api`].

pub mod error;
pub mod schema;
pub mod streaming;
pub mod tool;
pub mod types;

pub use error::{Result, SonarError};
pub use schema::StructuredOutput;
pub use streaming::{ChatCompletionChunk, ChatCompletionStream};
pub use tool::{ErasedTool, Tool, ToolDefinition, ToolError, ToolRegistry};
pub use types::*;

use async_trait::async_trait;
use reqwest::{header, Client};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Official Sonar API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Model used when none is specified.
pub const DEFAULT_MODEL: &str = "sonar-pro";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PPLX_API_KEY";

/// Chat-completion transport.
///
/// Implemented by [`SonarClient`]; callers depend on this trait so a mock
/// transport can stand in during tests.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one chat completion and return the first choice.
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Send one chat completion with `stream: true`.
    async fn chat_completion_stream(&self, request: ChatRequest) -> Result<ChatCompletionStream>;
}

/// Sonar API client.
#[derive(Clone)]
pub struct SonarClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SonarClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `PPLX_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SonarError::Config(format!("{} not set", API_KEY_ENV)))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SonarError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "Sonar request failed");
                SonarError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "Sonar API error");
            return Err(SonarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatApi for SonarClient {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let body = serde_json::to_value(&request)
            .map_err(|e| SonarError::Parse(format!("Failed to serialize request: {}", e)))?;
        let response = self.post(&body).await?;

        let text = response
            .text()
            .await
            .map_err(|e| SonarError::Network(e.to_string()))?;

        let raw: types::ChatResponseRaw = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                return Err(SonarError::InvalidResponse {
                    message: e.to_string(),
                    body: text,
                })
            }
        };

        let Some(content) = raw.choices.into_iter().next().map(|c| c.message.content) else {
            return Err(SonarError::InvalidResponse {
                message: "No choices in Sonar response".into(),
                body: text,
            });
        };

        debug!(
            model = %request.model,
            structured = request.is_structured(),
            citations = raw.citations.len(),
            duration_ms = start.elapsed().as_millis(),
            "Sonar chat completion"
        );

        Ok(ChatResponse {
            content,
            citations: raw.citations,
            usage: raw.usage,
        })
    }

    async fn chat_completion_stream(&self, request: ChatRequest) -> Result<ChatCompletionStream> {
        let mut body = serde_json::to_value(&request)
            .map_err(|e| SonarError::Parse(format!("Failed to serialize request: {}", e)))?;
        body["stream"] = serde_json::Value::Bool(true);

        let response = self.post(&body).await?;
        debug!(model = %request.model, "Sonar stream opened");

        Ok(ChatCompletionStream::from_byte_stream(response.bytes_stream()))
    }
}
