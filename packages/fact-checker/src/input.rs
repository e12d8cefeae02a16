//! Input acquisition: literal text, a local file, or an article URL.

use std::path::PathBuf;

use tracing::debug;

use crate::article::ArticleFetcher;
use crate::error::{FactCheckError, Result};

/// Where the content to check comes from. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Literal(String),
    File(PathBuf),
    Url(String),
}

/// Which kind of source a request was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Literal,
    File,
    Url,
}

impl InputSource {
    /// Build from the three optional selections; exactly one must be present.
    pub fn from_selection(
        text: Option<String>,
        file: Option<PathBuf>,
        url: Option<String>,
    ) -> Result<Self> {
        let selected = [text.is_some(), file.is_some(), url.is_some()]
            .iter()
            .filter(|s| **s)
            .count();

        match selected {
            0 => Err(FactCheckError::Usage(
                "provide text to check (positional or --text), --file, or --url".into(),
            )),
            1 => Ok(match (text, file, url) {
                (Some(text), _, _) => InputSource::Literal(text),
                (_, Some(path), _) => InputSource::File(path),
                (_, _, Some(url)) => InputSource::Url(url),
                (None, None, None) => unreachable!("exactly one selection counted"),
            }),
            _ => Err(FactCheckError::Usage(
                "text, --file and --url are mutually exclusive".into(),
            )),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            InputSource::Literal(_) => SourceKind::Literal,
            InputSource::File(_) => SourceKind::File,
            InputSource::Url(_) => SourceKind::Url,
        }
    }

    /// Acquire the content, producing a request ready for the pipeline.
    pub async fn acquire(self, fetcher: &dyn ArticleFetcher) -> Result<VerificationRequest> {
        let kind = self.kind();
        let content = match self {
            InputSource::Literal(text) => text,
            InputSource::File(path) => std::fs::read_to_string(&path).map_err(|e| {
                FactCheckError::Input(format!("error reading file {}: {}", path.display(), e))
            })?,
            InputSource::Url(url) => fetcher.fetch_article(&url).await?,
        };

        debug!(kind = ?kind, content_len = content.len(), "Input acquired");
        VerificationRequest::new(content, kind)
    }
}

/// Content to verify, consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    content: String,
    source_kind: SourceKind,
}

impl VerificationRequest {
    /// Rejects blank content.
    pub fn new(content: impl Into<String>, source_kind: SourceKind) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(FactCheckError::Input("no text found to fact check".into()));
        }
        Ok(Self {
            content,
            source_kind,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }
}
