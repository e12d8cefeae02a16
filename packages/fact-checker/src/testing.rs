//! Testing utilities including mock implementations.
//!
//! These let the pipeline and CLI run end to end without network access.
//! Both mocks share their state behind `Arc`, so a clone handed to the code
//! under test still reports its calls to the original.

use async_trait::async_trait;
use bytes::Bytes;
use sonar_client::{
    ChatApi, ChatCompletionStream, ChatRequest, ChatResponse, Result as SonarResult, SonarError,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::article::ArticleFetcher;
use crate::error::{FactCheckError, Result};

#[derive(Debug, Clone)]
enum MockReply {
    Answer(ChatResponse),
    Upstream { status: u16, body: String },
    Network(String),
}

/// A mock Sonar transport.
///
/// Replays one configured reply for every call and records each request.
#[derive(Default, Clone)]
pub struct MockSonar {
    reply: Arc<RwLock<Option<MockReply>>>,
    requests: Arc<RwLock<Vec<ChatRequest>>>,
}

impl MockSonar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `content` and no citations.
    pub fn with_answer(self, content: impl Into<String>) -> Self {
        self.with_response(ChatResponse::text(content))
    }

    pub fn with_response(self, response: ChatResponse) -> Self {
        *self.reply.write().unwrap() = Some(MockReply::Answer(response));
        self
    }

    /// Fail every call with a non-2xx status.
    pub fn with_status(self, status: u16, body: impl Into<String>) -> Self {
        *self.reply.write().unwrap() = Some(MockReply::Upstream {
            status,
            body: body.into(),
        });
        self
    }

    /// Fail every call at the transport level.
    pub fn with_network_failure(self, message: impl Into<String>) -> Self {
        *self.reply.write().unwrap() = Some(MockReply::Network(message.into()));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }

    fn record(&self, request: ChatRequest) -> SonarResult<ChatResponse> {
        self.requests.write().unwrap().push(request);

        match self.reply.read().unwrap().clone() {
            Some(MockReply::Answer(response)) => Ok(response),
            Some(MockReply::Upstream { status, body }) => Err(SonarError::Api { status, body }),
            Some(MockReply::Network(message)) => Err(SonarError::Network(message)),
            None => Err(SonarError::Network("mock has no reply configured".into())),
        }
    }
}

#[async_trait]
impl ChatApi for MockSonar {
    async fn chat_completion(&self, request: ChatRequest) -> SonarResult<ChatResponse> {
        self.record(request)
    }

    async fn chat_completion_stream(&self, request: ChatRequest) -> SonarResult<ChatCompletionStream> {
        let response = self.record(request)?;
        let events = sse_events(&response);
        Ok(ChatCompletionStream::from_byte_stream(futures::stream::iter(
            events.into_iter().map(Ok),
        )))
    }
}

/// Encode an answer as SSE events, one per word.
fn sse_events(response: &ChatResponse) -> Vec<Bytes> {
    let mut events: Vec<Bytes> = response
        .content
        .split_inclusive(' ')
        .map(|piece| {
            let event = serde_json::json!({
                "choices": [{ "delta": { "content": piece } }],
                "citations": response.citations,
            });
            Bytes::from(format!("data: {}\n\n", event))
        })
        .collect();
    events.push(Bytes::from_static(b"data: [DONE]\n\n"));
    events
}

/// A mock article fetcher with predefined pages.
#[derive(Default, Clone)]
pub struct MockFetcher {
    articles: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.articles.write().unwrap().insert(url.into(), text.into());
        self
    }

    /// Make fetches of `url` fail.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(url.into());
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl ArticleFetcher for MockFetcher {
    async fn fetch_article(&self, url: &str) -> Result<String> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failing.read().unwrap().contains(url) {
            return Err(FactCheckError::Input(format!("failed to fetch {}", url)));
        }

        self.articles
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FactCheckError::Input(format!("HTTP 404 Not Found for {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_mock_sonar_records_requests() {
        let mock = MockSonar::new().with_answer("hello");
        let handle = mock.clone();

        let response = mock
            .chat_completion(ChatRequest::new("sonar"))
            .await
            .unwrap();

        assert_eq!(response.content, "hello");
        assert_eq!(handle.call_count(), 1);
        assert_eq!(handle.requests()[0].model, "sonar");
    }

    #[tokio::test]
    async fn test_mock_sonar_status() {
        let mock = MockSonar::new().with_status(403, "forbidden");
        let err = mock
            .chat_completion(ChatRequest::new("sonar"))
            .await
            .unwrap_err();
        assert!(matches!(err, SonarError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_mock_sonar_stream_reassembles() {
        let mock = MockSonar::new().with_response(
            ChatResponse::text("The sky is blue.").with_citations(vec!["https://a".into()]),
        );
        let mut stream = mock
            .chat_completion_stream(ChatRequest::new("sonar"))
            .await
            .unwrap();

        let mut text = String::new();
        let mut citations = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if chunk.done {
                break;
            }
            text.push_str(&chunk.delta);
            citations = chunk.citations;
        }

        assert_eq!(text, "The sky is blue.");
        assert_eq!(citations, vec!["https://a".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_fail_url() {
        let fetcher = MockFetcher::new()
            .with_article("https://ok.test", "body")
            .fail_url("https://down.test");

        assert_eq!(fetcher.fetch_article("https://ok.test").await.unwrap(), "body");
        assert!(fetcher.fetch_article("https://down.test").await.is_err());
        assert!(fetcher.fetch_article("https://unknown.test").await.is_err());
        assert_eq!(fetcher.call_count(), 3);
    }
}
