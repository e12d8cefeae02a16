//! The pipeline exposed as a `fact_check` tool.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use sonar_client::{ChatApi, Tool};

use crate::error::FactCheckError;
use crate::input::{SourceKind, VerificationRequest};
use crate::pipeline::ClaimVerificationPipeline;
use crate::verdict::VerificationResponse;

/// Arguments of the `fact_check` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FactCheckArgs {
    /// Text whose factual claims should be checked
    pub text: String,
}

/// Fact-checks literal text through a pipeline.
pub struct FactCheckTool<A: ChatApi> {
    pipeline: ClaimVerificationPipeline<A>,
}

impl<A: ChatApi> FactCheckTool<A> {
    pub fn new(pipeline: ClaimVerificationPipeline<A>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl<A: ChatApi + 'static> Tool for FactCheckTool<A> {
    const NAME: &'static str = "fact_check";
    type Args = FactCheckArgs;
    type Output = VerificationResponse;
    type Error = FactCheckError;

    fn description(&self) -> &str {
        "Check the factual claims in a text and rate each one as TRUE, FALSE, MISLEADING or UNVERIFIABLE"
    }

    async fn call(&self, args: FactCheckArgs) -> Result<VerificationResponse, FactCheckError> {
        let request = VerificationRequest::new(args.text, SourceKind::Literal)?;
        let verdict = self.pipeline.verify(&request).await?;
        Ok(verdict.response)
    }
}
