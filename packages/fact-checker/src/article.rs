//! Article fetching and main-text extraction for URL input.
//!
//! Fetches a page with a browser-like client, picks the main content
//! container (`article`, `main`, common content classes), strips navigation
//! and other boilerplate, and converts what remains to markdown text.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{FactCheckError, Result};

/// Default timeout for article fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches a URL and returns its main article text.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Non-empty article text, or `FactCheckError::Input`.
    async fn fetch_article(&self, url: &str) -> Result<String>;
}

/// Article fetcher over HTTP using reqwest + scraper + htmd.
pub struct HttpArticleFetcher {
    client: reqwest::Client,
}

impl HttpArticleFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        // Some news sites reject obvious bots
        let user_agent = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| {
                FactCheckError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Article fetch failed");
            FactCheckError::Input(format!("failed to fetch {}: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FactCheckError::Input(format!("HTTP {} for {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| FactCheckError::Input(format!("failed to read body of {}: {}", url, e)))
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_article(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FactCheckError::Input(format!("invalid URL '{}': {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FactCheckError::Input(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        info!(url = %url, "Fetching article");
        let html = self.fetch_html(url).await?;
        let text = extract_article_text(&html);

        debug!(url = %url, html_len = html.len(), text_len = text.len(), "Article extracted");

        if text.trim().is_empty() {
            return Err(FactCheckError::Input(format!(
                "could not extract article text from {}",
                url
            )));
        }
        Ok(text)
    }
}

/// Main article text of an HTML document, as markdown.
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let content = main_content_html(&document);
    let cleaned = remove_boilerplate(&content);

    let markdown = htmd::convert(&cleaned).unwrap_or_else(|_| {
        Html::parse_fragment(&cleaned)
            .root_element()
            .text()
            .collect::<String>()
    });

    collapse_blank_lines(&markdown)
}

fn main_content_html(document: &Html) -> String {
    const MAIN_SELECTORS: [&str; 9] = [
        "article",
        "main",
        "[role='main']",
        "#content",
        "#main",
        ".post-content",
        ".entry-content",
        ".article-body",
        ".content",
    ];

    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(main) = document.select(&selector).next() {
                return main.html();
            }
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next().map(|el| el.html()))
        .unwrap_or_else(|| document.html())
}

fn remove_boilerplate(html: &str) -> String {
    const UNWANTED: [&str; 16] = [
        "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "form",
        ".nav", ".navbar", ".sidebar", ".menu", ".advertisement", ".ads", ".share",
    ];

    let fragment = Html::parse_fragment(html);
    let mut result = html.to_string();
    for selector_str in UNWANTED {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in fragment.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }
    result
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim().to_string()
}
