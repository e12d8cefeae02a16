//! Wire types for the Sonar chat-completions endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Request
// =============================================================================

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// `sonar`, `sonar-pro`, `sonar-reasoning`, ...
    pub model: String,

    pub messages: Vec<Message>,

    /// Restrict web search to (or, with a `-` prefix, away from) these domains
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_domain_filter: Vec<String>,

    /// `hour`, `day`, `week`, `month` or `year`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MODEL)
    }
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            search_domain_filter: Vec::new(),
            search_recency_filter: None,
            response_format: None,
        }
    }

    /// Append a message; order is preserved on the wire.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn search_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_domain_filter = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_recency(mut self, window: impl Into<String>) -> Self {
        self.search_recency_filter = Some(window.into());
        self
    }

    /// Constrain the answer to JSON matching `schema`.
    pub fn json_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_format = Some(ResponseFormat::json_schema(schema));
        self
    }

    pub fn is_structured(&self) -> bool {
        self.response_format.is_some()
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

// =============================================================================
// Response
// =============================================================================

/// First choice of a completion, plus the web sources Sonar searched.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,

    /// Source URLs, in the order the answer numbers them (`[1]` is index 0)
    pub citations: Vec<String>,

    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Response with content only.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }
}

/// Envelope as it arrives on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<RawChoice>,
    #[serde(default)]
    pub citations: Vec<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawChoice {
    pub message: RawMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    #[serde(default)]
    pub content: String,
}

/// Token and search accounting reported with a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    /// Tokens spent on retrieved sources (some models only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_search_queries: Option<u32>,
}

// =============================================================================
// Structured Output
// =============================================================================

/// `response_format` body. Sonar takes the schema without a name or strict flag.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

impl ResponseFormat {
    pub fn json_schema(schema: serde_json::Value) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat { schema },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub schema: serde_json::Value,
}

// =============================================================================
// Utilities
// =============================================================================

/// Longest prefix of `s` of at most `max_bytes` bytes that ends on a char boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|i| s.is_char_boundary(*i))
        .unwrap_or(0);
    &s[..end]
}

/// Remove a surrounding markdown fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_blocks(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
