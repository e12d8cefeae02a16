//! Verdict types: the structured contract the model is asked to return.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall rating of the checked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallRating {
    MostlyTrue,
    Mixed,
    MostlyFalse,
}

impl OverallRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallRating::MostlyTrue => "MOSTLY_TRUE",
            OverallRating::Mixed => "MIXED",
            OverallRating::MostlyFalse => "MOSTLY_FALSE",
        }
    }
}

impl fmt::Display for OverallRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating of a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimRating {
    True,
    False,
    Misleading,
    Unverifiable,
}

impl ClaimRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimRating::True => "TRUE",
            ClaimRating::False => "FALSE",
            ClaimRating::Misleading => "MISLEADING",
            ClaimRating::Unverifiable => "UNVERIFIABLE",
        }
    }
}

impl fmt::Display for ClaimRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One claim extracted from the input and its assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimAssessment {
    /// The specific claim extracted from the text
    pub claim: String,
    /// Rating of the claim
    pub rating: ClaimRating,
    /// Explanation with supporting evidence
    pub explanation: String,
    /// Sources used to verify the claim
    pub sources: Vec<String>,
}

/// The complete fact-check result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationResponse {
    /// Overall rating of the text
    pub overall_rating: OverallRating,
    /// Brief summary of the findings
    pub summary: String,
    /// Claims and their assessments, in the order they appear
    pub claims: Vec<ClaimAssessment>,
    /// Citation URLs reported by the API alongside the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(skip)]
    pub citations: Vec<String>,
}

impl VerificationResponse {
    pub fn new(overall_rating: OverallRating, summary: impl Into<String>) -> Self {
        Self {
            overall_rating,
            summary: summary.into(),
            claims: Vec::new(),
            citations: Vec::new(),
        }
    }

    pub fn with_claim(mut self, claim: ClaimAssessment) -> Self {
        self.claims.push(claim);
        self
    }
}

/// How much the parsed verdict can be trusted to reflect the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseConfidence {
    High,
    Low,
}

/// Outcome of parsing a model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdict {
    pub response: VerificationResponse,
    pub confidence: ParseConfidence,
    /// Non-fatal notes from best-effort parsing
    pub notes: Vec<String>,
}

impl ParsedVerdict {
    pub fn confident(response: VerificationResponse) -> Self {
        Self {
            response,
            confidence: ParseConfidence::High,
            notes: Vec::new(),
        }
    }

    /// Record a note and drop confidence to `Low`.
    pub fn note(&mut self, note: impl Into<String>) {
        self.confidence = ParseConfidence::Low;
        self.notes.push(note.into());
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence == ParseConfidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_client::StructuredOutput;

    #[test]
    fn test_wire_names() {
        let response = VerificationResponse::new(OverallRating::MostlyFalse, "Wrong.").with_claim(
            ClaimAssessment {
                claim: "The sky is green".into(),
                rating: ClaimRating::False,
                explanation: "Rayleigh scattering makes it blue.".into(),
                sources: vec!["NASA.gov".into()],
            },
        );
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["overall_rating"], "MOSTLY_FALSE");
        assert_eq!(value["claims"][0]["rating"], "FALSE");
        assert!(value.get("citations").is_none());
    }

    #[test]
    fn test_schema_matches_contract() {
        let schema = VerificationResponse::sonar_schema();
        let props = schema["properties"].as_object().unwrap();

        assert!(props.contains_key("overall_rating"));
        assert!(props.contains_key("summary"));
        assert!(props.contains_key("claims"));
        assert!(!props.contains_key("citations"));

        let text = serde_json::to_string(&schema).unwrap();
        for value in ["MOSTLY_TRUE", "MIXED", "MOSTLY_FALSE", "TRUE", "MISLEADING", "UNVERIFIABLE"] {
            assert!(text.contains(value), "schema should list {}", value);
        }
    }

    #[test]
    fn test_note_lowers_confidence() {
        let mut verdict =
            ParsedVerdict::confident(VerificationResponse::new(OverallRating::Mixed, ""));
        assert!(!verdict.is_low_confidence());

        verdict.note("no rating found");
        assert!(verdict.is_low_confidence());
        assert_eq!(verdict.notes.len(), 1);
    }
}
