//! The claim-verification pipeline.
//!
//! One invocation makes exactly one chat-completion call: build the prompt,
//! send it, parse the answer, and attach the citations the API returned.
//! Nothing is retried.

use futures::StreamExt;
use sonar_client::{ChatApi, ChatRequest};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::{FactCheckError, Result};
use crate::input::VerificationRequest;
use crate::parser::{parser_for, resolve_citation_refs, ResponseParser};
use crate::prompt::{build_request, load_system_prompt, SearchFilter, DEFAULT_SYSTEM_PROMPT};
use crate::verdict::ParsedVerdict;

/// Verifies claims through a [`ChatApi`] transport.
pub struct ClaimVerificationPipeline<A: ChatApi> {
    api: A,
    model: String,
    system_prompt: String,
    structured_output: bool,
    search: SearchFilter,
    parser: Box<dyn ResponseParser>,
}

impl<A: ChatApi> ClaimVerificationPipeline<A> {
    /// Pipeline with the built-in system prompt.
    pub fn new(api: A, model: impl Into<String>, structured_output: bool) -> Self {
        Self {
            api,
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            structured_output,
            search: SearchFilter::default(),
            parser: parser_for(structured_output),
        }
    }

    /// Pipeline set up from a resolved configuration, loading any custom
    /// system prompt it names.
    pub fn from_config(api: A, config: &Configuration) -> Result<Self> {
        let pipeline = Self::new(api, config.model.clone(), config.structured_output)
            .with_search_filter(config.search.clone());
        match &config.prompt_file {
            Some(path) => pipeline.with_prompt_file(path),
            None => Ok(pipeline),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_prompt_file(self, path: &Path) -> Result<Self> {
        let prompt = load_system_prompt(path)?;
        debug!(path = %path.display(), "Loaded custom system prompt");
        Ok(self.with_system_prompt(prompt))
    }

    pub fn with_search_filter(mut self, search: SearchFilter) -> Self {
        self.search = search;
        self
    }

    fn request_for(&self, request: &VerificationRequest) -> ChatRequest {
        self.search.apply(build_request(
            &self.model,
            &self.system_prompt,
            request.content(),
            self.structured_output,
        ))
    }

    /// Verify the request's content and return the parsed verdict.
    pub async fn verify(&self, request: &VerificationRequest) -> Result<ParsedVerdict> {
        info!(
            model = %self.model,
            structured = self.structured_output,
            content_len = request.content().len(),
            "Sending fact-check request"
        );

        let response = self.api.chat_completion(self.request_for(request)).await?;

        debug!(
            answer_len = response.content.len(),
            citations = response.citations.len(),
            "Received answer"
        );

        let mut verdict = self.parser.parse(&response.content)?;
        if verdict.response.citations.is_empty() {
            verdict.response.citations = response.citations;
        }
        resolve_citation_refs(&mut verdict.response);

        if verdict.is_low_confidence() {
            warn!(notes = ?verdict.notes, "Answer parsed with low confidence");
        }
        Ok(verdict)
    }

    /// Stream the raw answer into `out` as it arrives, without parsing.
    ///
    /// Returns the citations reported with the stream.
    pub async fn verify_streaming(
        &self,
        request: &VerificationRequest,
        out: &mut impl Write,
    ) -> Result<Vec<String>> {
        if self.structured_output {
            return Err(FactCheckError::Usage(
                "streaming cannot be combined with structured output".into(),
            ));
        }

        info!(model = %self.model, "Streaming fact-check request");
        let mut stream = self
            .api
            .chat_completion_stream(self.request_for(request))
            .await?;

        let mut citations = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.done {
                break;
            }
            if !chunk.citations.is_empty() {
                citations = chunk.citations;
            }
            if !chunk.delta.is_empty() {
                out.write_all(chunk.delta.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| FactCheckError::Input(format!("failed to write output: {}", e)))?;
            }
        }

        Ok(citations)
    }
}
