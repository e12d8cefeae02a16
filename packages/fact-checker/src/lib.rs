//! Claim verification with the Perplexity Sonar API
//!
//! Takes text (literal, from a file, or the main body of a web article),
//! asks a Sonar model to identify and rate its factual claims, and turns the
//! answer into a typed verdict: an overall rating, a summary, and a rating,
//! explanation and sources for each claim.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fact_checker::{ClaimVerificationPipeline, SourceKind, VerificationRequest};
//! use sonar_client::SonarClient;
//!
//! let client = SonarClient::from_env()?;
//! let pipeline = ClaimVerificationPipeline::new(client, "sonar-pro", true);
//!
//! let request = VerificationRequest::new("The Great Wall is visible from space.", SourceKind::Literal)?;
//! let verdict = pipeline.verify(&request).await?;
//!
//! println!("{}", verdict.response.overall_rating);
//! ```
//!
//! # Modules
//!
//! - [`config`] - Configuration resolved from flags, environment and key files
//! - [`input`] - Input acquisition (text, file, URL)
//! - [`article`] - Article fetching and main-text extraction
//! - [`prompt`] - System and user prompt assembly
//! - [`pipeline`] - One-call verification pipeline
//! - [`parser`] - Structured and heuristic answer parsing
//! - [`render`] - Terminal and JSON output
//! - [`tool`] - The pipeline as a `fact_check` tool
//! - [`testing`] - Mock transport and fetcher

pub mod article;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod input;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod testing;
pub mod tool;
pub mod verdict;

pub use article::{ArticleFetcher, HttpArticleFetcher};
pub use config::{ConfigOverrides, Configuration, Environment};
pub use credentials::{ApiKey, KeySource};
pub use error::{FactCheckError, ParseErrorKind, Result};
pub use input::{InputSource, SourceKind, VerificationRequest};
pub use parser::{HeuristicParser, HeuristicPatterns, ResponseParser, StructuredParser};
pub use pipeline::ClaimVerificationPipeline;
pub use tool::{FactCheckArgs, FactCheckTool};
pub use verdict::{
    ClaimAssessment, ClaimRating, OverallRating, ParseConfidence, ParsedVerdict,
    VerificationResponse,
};

// Re-export testing utilities
pub use testing::{MockFetcher, MockSonar};
