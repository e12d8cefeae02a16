//! Prompt assembly for fact-check requests.

use std::path::Path;

use sonar_client::{ChatRequest, Message, StructuredOutput};

use crate::error::{FactCheckError, Result};
use crate::verdict::VerificationResponse;

/// Built-in system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional fact-checker with extensive research capabilities. Your task is to evaluate claims or articles for factual accuracy, focusing on false, misleading, or unsubstantiated claims.

For each piece of text:
1. Identify the specific factual claims it makes.
2. Research each claim against reliable, authoritative sources.
3. Rate each claim as TRUE, FALSE, MISLEADING, or UNVERIFIABLE.
4. Explain each rating with evidence, and cite the sources you used.
5. Give the text an overall rating of MOSTLY_TRUE, MIXED, or MOSTLY_FALSE.

Format your answer as:

Overall Rating: <MOSTLY_TRUE | MIXED | MOSTLY_FALSE>

Summary:
<a brief summary of your findings>

Claim 1: <the claim>
Rating: <TRUE | FALSE | MISLEADING | UNVERIFIABLE>
Explanation: <your explanation>
Sources: <comma-separated sources>

Repeat the claim block for every claim. Be objective and precise, prefer primary sources, and do not speculate beyond the evidence."#;

/// Accepted values of Sonar's `search_recency_filter`.
pub const RECENCY_WINDOWS: [&str; 5] = ["hour", "day", "week", "month", "year"];

/// Restrictions on the web search behind the answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Domains to search, or to exclude when prefixed with `-`
    pub domains: Vec<String>,
    /// One of [`RECENCY_WINDOWS`]
    pub recency: Option<String>,
}

impl SearchFilter {
    pub fn apply(&self, request: ChatRequest) -> ChatRequest {
        let request = if self.domains.is_empty() {
            request
        } else {
            request.search_domains(self.domains.iter().cloned())
        };
        match &self.recency {
            Some(window) => request.search_recency(window.clone()),
            None => request,
        }
    }
}

const USER_PREAMBLE: &str =
    "Fact check the following text and identify any false or misleading claims:";

/// Read a custom system prompt.
pub fn load_system_prompt(path: &Path) -> Result<String> {
    let prompt = std::fs::read_to_string(path).map_err(|e| {
        FactCheckError::Input(format!("error reading prompt file {}: {}", path.display(), e))
    })?;

    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(FactCheckError::Input(format!(
            "prompt file {} is empty",
            path.display()
        )));
    }
    Ok(prompt.to_string())
}

/// The user message wrapping the content to check.
pub fn user_prompt(content: &str) -> String {
    format!("{}\n\n{}", USER_PREAMBLE, content)
}

/// Build the outbound request: `[system, user]`, plus the verdict schema
/// when structured output is requested.
pub fn build_request(
    model: &str,
    system_prompt: &str,
    content: &str,
    structured_output: bool,
) -> ChatRequest {
    let request = ChatRequest::new(model)
        .message(Message::system(system_prompt))
        .message(Message::user(user_prompt(content)));

    if structured_output {
        request.json_schema(VerificationResponse::sonar_schema())
    } else {
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_order() {
        let request = build_request("sonar-pro", "SYSTEM", "The sky is green", false);

        assert_eq!(request.model, "sonar-pro");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0], Message::system("SYSTEM"));
        assert_eq!(request.messages[1].role, sonar_client::Role::User);
        assert!(request.messages[1].content.ends_with("\n\nThe sky is green"));
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_structured_attaches_schema() {
        let request = build_request("sonar-pro", DEFAULT_SYSTEM_PROMPT, "x", true);
        let format = request.response_format.expect("schema attached");

        assert_eq!(format.format_type, "json_schema");
        assert!(format.json_schema.schema["properties"]["claims"].is_object());
    }

    #[test]
    fn test_search_filter_applied() {
        let filter = SearchFilter {
            domains: vec!["nasa.gov".into(), "-reddit.com".into()],
            recency: Some("week".into()),
        };
        let request = filter.apply(build_request("sonar", "SYSTEM", "x", false));

        assert_eq!(request.search_domain_filter, vec!["nasa.gov", "-reddit.com"]);
        assert_eq!(request.search_recency_filter.as_deref(), Some("week"));

        let untouched = SearchFilter::default().apply(build_request("sonar", "SYSTEM", "x", false));
        assert!(untouched.search_domain_filter.is_empty());
        assert!(untouched.search_recency_filter.is_none());
    }

    #[test]
    fn test_load_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_prompt.md");
        std::fs::write(&path, "\nBe terse.\n").unwrap();

        assert_eq!(load_system_prompt(&path).unwrap(), "Be terse.");
    }

    #[test]
    fn test_missing_or_empty_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_system_prompt(&dir.path().join("nope.md")).unwrap_err();
        assert!(matches!(missing, FactCheckError::Input(_)));

        let empty = dir.path().join("empty.md");
        std::fs::write(&empty, "   \n").unwrap();
        assert!(matches!(
            load_system_prompt(&empty).unwrap_err(),
            FactCheckError::Input(_)
        ));
    }
}
