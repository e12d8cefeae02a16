//! Command-line surface of `fact-check`.
//!
//! [`run`] takes its collaborators explicitly (environment snapshot, a
//! constructor for the chat transport, the article fetcher, the output sink)
//! so the whole invocation can be exercised with mocks.

use clap::Parser;
use sonar_client::{ChatApi, SonarClient};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::article::ArticleFetcher;
use crate::config::{ConfigOverrides, Configuration, Environment};
use crate::error::{FactCheckError, Result};
use crate::input::InputSource;
use crate::pipeline::ClaimVerificationPipeline;
use crate::prompt::RECENCY_WINDOWS;
use crate::render::{render_json, render_report};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fact-check")]
#[command(about = "Identify false or misleading claims in text using the Perplexity Sonar API")]
#[command(version)]
pub struct Cli {
    /// Text to fact check
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Text to fact check (alternative to the positional argument)
    #[arg(short = 't', long = "text", value_name = "TEXT")]
    pub text_flag: Option<String>,

    /// Read the text to check from a file
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Fetch an article and check its main text
    #[arg(short, long)]
    pub url: Option<String>,

    /// Sonar model to use [env: PPLX_MODEL] [default: sonar-pro]
    #[arg(short, long)]
    pub model: Option<String>,

    /// API key [env: PPLX_API_KEY]
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Custom system prompt file
    #[arg(short, long, value_name = "PATH")]
    pub prompt_file: Option<PathBuf>,

    /// API base URL [env: PPLX_BASE_URL]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout [env: PPLX_TIMEOUT_SECS]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Limit the web search to a domain, or exclude one with a leading '-' (repeatable)
    #[arg(long = "search-domain", value_name = "DOMAIN", allow_hyphen_values = true)]
    pub search_domains: Vec<String>,

    /// Only use sources published within this window
    #[arg(long, value_name = "WINDOW", value_parser = clap::builder::PossibleValuesParser::new(RECENCY_WINDOWS))]
    pub search_recency: Option<String>,

    /// Ask for schema-constrained JSON (tier-dependent)
    #[arg(long)]
    pub structured_output: bool,

    /// Print the verdict as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Print the answer as it arrives, unparsed
    #[arg(long)]
    pub stream: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Check flag combinations and pick the input source. Touches nothing
    /// outside the parsed arguments.
    pub fn validate(&self) -> Result<InputSource> {
        if self.stream && self.json {
            return Err(FactCheckError::Usage(
                "--stream cannot be combined with --json".into(),
            ));
        }
        if self.stream && self.structured_output {
            return Err(FactCheckError::Usage(
                "--stream cannot be combined with --structured-output".into(),
            ));
        }

        let text = match (&self.text, &self.text_flag) {
            (Some(_), Some(_)) => {
                return Err(FactCheckError::Usage(
                    "give the text either positionally or with --text, not both".into(),
                ))
            }
            (positional, flag) => positional.clone().or_else(|| flag.clone()),
        };

        InputSource::from_selection(text, self.file.clone(), self.url.clone())
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout,
            prompt_file: self.prompt_file.clone(),
            structured_output: self.structured_output,
            search_domains: self.search_domains.clone(),
            search_recency: self.search_recency.clone(),
        }
    }
}

/// Real transport for a resolved configuration.
pub fn connect(config: &Configuration) -> Result<SonarClient> {
    let client = SonarClient::new(config.api_key.expose()).with_base_url(&config.base_url);
    Ok(match config.timeout {
        Some(timeout) => client.with_timeout(timeout)?,
        None => client,
    })
}

/// Run one invocation and write its output to `out`.
pub async fn run<A, F>(
    cli: &Cli,
    env: &Environment,
    connect: F,
    fetcher: &dyn ArticleFetcher,
    out: &mut impl Write,
) -> Result<()>
where
    A: ChatApi,
    F: FnOnce(&Configuration) -> Result<A>,
{
    let source = cli.validate()?;
    let config = Configuration::resolve(&cli.overrides(), env)?;
    debug!(source = ?source.kind(), model = %config.model, "Starting fact check");

    let request = source.acquire(fetcher).await?;
    let pipeline = ClaimVerificationPipeline::from_config(connect(&config)?, &config)?;

    if cli.stream {
        let citations = pipeline.verify_streaming(&request, out).await?;
        return write_stream_footer(&citations, out);
    }

    let verdict = pipeline.verify(&request).await?;
    if cli.json {
        render_json(&verdict, out)
    } else {
        render_report(&verdict, out)
    }
}

fn write_stream_footer(citations: &[String], out: &mut impl Write) -> Result<()> {
    fn write(citations: &[String], out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out)?;
        if !citations.is_empty() {
            writeln!(out)?;
            writeln!(out, "Citations:")?;
            for (i, url) in citations.iter().enumerate() {
                writeln!(out, "  [{}] {}", i + 1, url)?;
            }
        }
        Ok(())
    }
    write(citations, out).map_err(|e| FactCheckError::Input(format!("failed to write output: {}", e)))
}
