//! Parsing model answers into verdicts.
//!
//! Two strategies share the [`ResponseParser`] interface:
//!
//! - [`StructuredParser`] for answers produced under a JSON-schema response
//!   format. Strict: any mismatch is a `ParseError` carrying the raw text.
//! - [`HeuristicParser`] for free-form answers. Best-effort: it first looks
//!   for a JSON verdict (fenced or bare), then segments prose into rating,
//!   summary and `Claim N:` blocks. A missing rating yields `MIXED` with a
//!   low-confidence note instead of an error.
//!
//! The prose patterns live in [`HeuristicPatterns`] and can be replaced
//! wholesale; nothing outside this module depends on their shape.

use regex::Regex;
use sonar_client::strip_code_blocks;
use tracing::debug;

use crate::error::{FactCheckError, ParseErrorKind, Result};
use crate::verdict::{ClaimAssessment, ClaimRating, OverallRating, ParsedVerdict, VerificationResponse};

/// Turns a raw model answer into a verdict.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict>;
}

/// Parser matching the requested output mode.
pub fn parser_for(structured_output: bool) -> Box<dyn ResponseParser> {
    if structured_output {
        Box::new(StructuredParser)
    } else {
        Box::new(HeuristicParser::default())
    }
}

/// Drop a leading `<think>...</think>` block emitted by reasoning models.
pub fn strip_reasoning(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    if trimmed.starts_with("<think>") {
        if let Some(end) = trimmed.find("</think>") {
            return trimmed[end + "</think>".len()..].trim();
        }
    }
    raw.trim()
}

// =============================================================================
// Structured
// =============================================================================

/// Strict JSON parser for schema-constrained answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredParser;

impl ResponseParser for StructuredParser {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict> {
        serde_json::from_str::<VerificationResponse>(strip_reasoning(raw))
            .map(ParsedVerdict::confident)
            .map_err(|e| {
                let kind = match e.classify() {
                    serde_json::error::Category::Data => ParseErrorKind::SchemaMismatch,
                    _ => ParseErrorKind::InvalidJson,
                };
                FactCheckError::Parse {
                    kind,
                    message: e.to_string(),
                    raw: raw.to_string(),
                }
            })
    }
}

// =============================================================================
// Heuristic
// =============================================================================

/// Line patterns used to segment a prose answer. Matched against lines with
/// emoji and markdown emphasis already stripped.
#[derive(Debug, Clone)]
pub struct HeuristicPatterns {
    /// A line that labels the overall rating
    pub overall_label: Regex,
    /// Overall rating vocabulary; group 1 is the token
    pub overall_token: Regex,
    /// Summary heading; group 1 is any text after it on the same line
    pub summary_heading: Regex,
    /// Standalone headings that end the summary or a claim block
    pub section_heading: Regex,
    /// Start of a claim block; group 1 is the number, group 2 the remainder
    pub claim_header: Regex,
    /// A labelled sub-line of a claim block; group 1 is the label, group 2 the value
    pub claim_field: Regex,
    /// Claim rating vocabulary; group 1 is the token
    pub claim_token: Regex,
    /// Numbered or bulleted list item prefix
    pub list_item: Regex,
}

impl Default for HeuristicPatterns {
    fn default() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("built-in pattern is valid");
        Self {
            overall_label: re(r"(?i)\boverall\b"),
            overall_token: re(r"(?i)\b(mostly[\s_-]*true|mostly[\s_-]*false|mixed)\b"),
            summary_heading: re(r"(?i)^summary(?:\s+of\s+findings)?\s*:?\s*(.*)$"),
            section_heading: re(
                r"(?i)^(?:claims?(?:\s+analysis)?|analysis|citations|references|conclusion)\s*:?\s*$",
            ),
            claim_header: re(r"(?i)^(?:[-*•]\s*)?claim\s*#?\s*(\d+)\s*[:.)\-–]?\s*(.*)$"),
            claim_field: re(
                r"(?i)^(?:[-*•]\s*)?(statement|claim|rating|verdict|explanation|reasoning|evidence|analysis|sources?)\s*:\s*(.*)$",
            ),
            claim_token: re(r"(?i)\b(true|false|misleading|unverifiable)\b"),
            list_item: re(r"^(?:[-*•]|\d+[.)])\s+"),
        }
    }
}

/// Best-effort parser for free-form answers.
#[derive(Debug, Clone, Default)]
pub struct HeuristicParser {
    patterns: HeuristicPatterns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Claim,
    Rating,
    Explanation,
    Sources,
}

#[derive(Debug, Default)]
struct ClaimDraft {
    number: String,
    claim: Vec<String>,
    rating: Option<ClaimRating>,
    explanation: Vec<String>,
    sources: Vec<String>,
}

impl ResponseParser for HeuristicParser {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict> {
        let body = strip_reasoning(raw);

        if let Some(response) = embedded_json(body) {
            debug!("Free-form answer contained a JSON verdict");
            return Ok(ParsedVerdict::confident(response));
        }

        Ok(self.parse_prose(body))
    }
}

impl HeuristicParser {
    pub fn with_patterns(patterns: HeuristicPatterns) -> Self {
        Self { patterns }
    }

    fn parse_prose(&self, text: &str) -> ParsedVerdict {
        let lines: Vec<String> = text.lines().map(clean_line).collect();
        let first_claim = lines
            .iter()
            .position(|l| self.patterns.claim_header.is_match(l))
            .unwrap_or(lines.len());

        let mut notes = Vec::new();

        let overall_rating = match self.find_overall(&lines, first_claim) {
            Some(rating) => rating,
            None => {
                notes.push("parse confidence low: no overall rating found; defaulted to MIXED".to_string());
                OverallRating::Mixed
            }
        };

        let summary = self.find_summary(&lines).unwrap_or_else(|| {
            notes.push("no summary section found".to_string());
            String::new()
        });

        let claims = self.parse_claims(&lines[first_claim..], &mut notes);

        debug!(
            rating = %overall_rating,
            claims = claims.len(),
            notes = notes.len(),
            "Segmented free-form answer"
        );

        let mut verdict = ParsedVerdict::confident(VerificationResponse {
            overall_rating,
            summary,
            claims,
            citations: Vec::new(),
        });
        for note in notes {
            verdict.note(note);
        }
        verdict
    }

    /// A labelled rating anywhere, else the first bare token before the claims.
    fn find_overall(&self, lines: &[String], preamble_len: usize) -> Option<OverallRating> {
        lines
            .iter()
            .filter(|l| self.patterns.overall_label.is_match(l))
            .find_map(|l| self.overall_token(l))
            .or_else(|| lines[..preamble_len].iter().find_map(|l| self.overall_token(l)))
    }

    fn overall_token(&self, line: &str) -> Option<OverallRating> {
        let token = self.patterns.overall_token.captures(line)?.get(1)?.as_str().to_lowercase();
        Some(if token.contains("true") {
            OverallRating::MostlyTrue
        } else if token.contains("false") {
            OverallRating::MostlyFalse
        } else {
            OverallRating::Mixed
        })
    }

    fn find_summary(&self, lines: &[String]) -> Option<String> {
        let start = lines
            .iter()
            .position(|l| self.patterns.summary_heading.is_match(l))?;

        let mut collected: Vec<&str> = Vec::new();
        if let Some(rest) = self
            .patterns
            .summary_heading
            .captures(&lines[start])
            .and_then(|c| c.get(1))
        {
            collected.push(rest.as_str());
        }

        for line in &lines[start + 1..] {
            if self.ends_section(line) {
                break;
            }
            collected.push(line);
        }

        let summary = collected.join("\n").trim().to_string();
        (!summary.is_empty()).then_some(summary)
    }

    fn ends_section(&self, line: &str) -> bool {
        self.patterns.claim_header.is_match(line)
            || self.patterns.section_heading.is_match(line)
            || self.patterns.summary_heading.is_match(line)
            || (self.patterns.overall_label.is_match(line) && self.overall_token(line).is_some())
    }

    fn parse_claims(&self, lines: &[String], notes: &mut Vec<String>) -> Vec<ClaimAssessment> {
        let mut claims = Vec::new();
        let mut current: Option<ClaimDraft> = None;
        let mut field = Field::None;

        for line in lines {
            if let Some(caps) = self.patterns.claim_header.captures(line) {
                if let Some(draft) = current.take() {
                    claims.push(finish_claim(draft, notes));
                }
                let mut draft = ClaimDraft {
                    number: caps[1].to_string(),
                    ..Default::default()
                };
                field = Field::None;

                let remainder = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                if !remainder.is_empty() {
                    match self.claim_rating_only(remainder) {
                        Some(rating) => draft.rating = Some(rating),
                        None => {
                            draft.claim.push(unquote(remainder).to_string());
                            field = Field::Claim;
                        }
                    }
                }
                current = Some(draft);
                continue;
            }

            let Some(draft) = current.as_mut() else {
                continue;
            };
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.patterns.claim_field.captures(line) {
                let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                field = match caps[1].to_lowercase().as_str() {
                    "statement" | "claim" => Field::Claim,
                    "rating" | "verdict" => Field::Rating,
                    "source" | "sources" => Field::Sources,
                    _ => Field::Explanation,
                };
                self.apply(draft, field, value, true);
                continue;
            }

            if self.ends_section(line) {
                if let Some(draft) = current.take() {
                    claims.push(finish_claim(draft, notes));
                }
                field = Field::None;
                continue;
            }

            let continuation = if field == Field::None {
                if draft.claim.is_empty() {
                    Field::Claim
                } else {
                    Field::Explanation
                }
            } else {
                field
            };
            self.apply(draft, continuation, line, false);
        }

        if let Some(draft) = current.take() {
            claims.push(finish_claim(draft, notes));
        }
        claims
    }

    fn apply(&self, draft: &mut ClaimDraft, field: Field, value: &str, labelled: bool) {
        if value.is_empty() {
            return;
        }
        match field {
            Field::Claim => draft.claim.push(unquote(value).to_string()),
            Field::Rating => {
                if draft.rating.is_none() {
                    draft.rating = self.claim_token(value);
                }
            }
            Field::Explanation => draft.explanation.push(value.to_string()),
            Field::Sources => {
                let item = self.patterns.list_item.replace(value, "");
                if labelled {
                    draft.sources.extend(split_sources(&item));
                } else {
                    draft.sources.push(item.trim().to_string());
                }
            }
            Field::None => {}
        }
    }

    fn claim_token(&self, value: &str) -> Option<ClaimRating> {
        let token = self.patterns.claim_token.captures(value)?.get(1)?.as_str().to_uppercase();
        match token.as_str() {
            "TRUE" => Some(ClaimRating::True),
            "FALSE" => Some(ClaimRating::False),
            "MISLEADING" => Some(ClaimRating::Misleading),
            "UNVERIFIABLE" => Some(ClaimRating::Unverifiable),
            _ => None,
        }
    }

    /// Rating when `text` is nothing but a rating token (e.g. `Claim 1: FALSE`).
    fn claim_rating_only(&self, text: &str) -> Option<ClaimRating> {
        let bare = text.trim_matches(|c: char| !c.is_alphanumeric());
        let rating = self.claim_token(bare)?;
        (bare.len() == rating.as_str().len()).then_some(rating)
    }
}

fn finish_claim(draft: ClaimDraft, notes: &mut Vec<String>) -> ClaimAssessment {
    let rating = draft.rating.unwrap_or_else(|| {
        notes.push(format!(
            "claim {} has no recognizable rating; marked UNVERIFIABLE",
            draft.number
        ));
        ClaimRating::Unverifiable
    });

    ClaimAssessment {
        claim: draft.claim.join(" "),
        rating,
        explanation: draft.explanation.join(" "),
        sources: draft.sources.into_iter().filter(|s| !s.is_empty()).collect(),
    }
}

/// A JSON verdict inside a fenced block, or the whole answer as JSON.
fn embedded_json(text: &str) -> Option<VerificationResponse> {
    let candidate = if let Some(start) = text.find("```") {
        let fenced = &text[start..];
        let end = fenced[3..].find("```").map(|i| i + 6).unwrap_or(fenced.len());
        strip_code_blocks(&fenced[..end])
    } else {
        text
    };
    serde_json::from_str(candidate).ok()
}

/// Emoji and pictographs. Arrows and mathematical operators are content.
fn is_decoration(c: char) -> bool {
    matches!(c as u32,
        0x200D | 0xFE0F            // joiner, emoji presentation selector
        | 0x2600..=0x27BF          // miscellaneous symbols, dingbats
        | 0x2B00..=0x2BFF          // symbols and arrows used as emoji
        | 0x1F000..=0x1FAFF)       // emoji
}

/// Strip emoji, emphasis markers and heading/quote prefixes.
fn clean_line(line: &str) -> String {
    let without_symbols: String = line.chars().filter(|c| !is_decoration(*c)).collect();
    without_symbols
        .replace("**", "")
        .replace('`', "")
        .trim()
        .trim_start_matches(['#', '>'])
        .trim()
        .to_string()
}

fn unquote(text: &str) -> &str {
    text.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\u{201C}' | '\u{201D}'))
        .trim()
}

fn split_sources(value: &str) -> Vec<String> {
    value
        .split(';')
        .flat_map(|part| part.split(", "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Replace numeric citation references (`[1]`) with the cited URL.
///
/// References are 1-based; out-of-range references are left as written.
pub fn resolve_citation_refs(response: &mut VerificationResponse) {
    if response.citations.is_empty() {
        return;
    }
    let citations = &response.citations;

    for claim in &mut response.claims {
        for source in &mut claim.sources {
            let index = source
                .trim()
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .and_then(|n| n.parse::<usize>().ok());

            if let Some(url) = index.and_then(|n| n.checked_sub(1)).and_then(|i| citations.get(i)) {
                *source = url.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = r#"{
        "overall_rating": "MOSTLY_FALSE",
        "summary": "The claim contradicts basic atmospheric physics.",
        "claims": [
            {
                "claim": "The sky is green",
                "rating": "FALSE",
                "explanation": "Rayleigh scattering makes the daytime sky blue.",
                "sources": ["NASA.gov", "[2]"]
            },
            {
                "claim": "Sunsets are red",
                "rating": "MISLEADING",
                "explanation": "Often orange or pink as well.",
                "sources": []
            }
        ]
    }"#;

    #[test]
    fn test_structured_round_trip_preserves_claims() {
        let verdict = StructuredParser.parse(STRUCTURED).unwrap();
        assert!(!verdict.is_low_confidence());

        let reserialized = serde_json::to_string(&verdict.response).unwrap();
        let reparsed = StructuredParser.parse(&reserialized).unwrap();
        assert_eq!(reparsed.response, verdict.response);

        let claims = &verdict.response.claims;
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].rating, ClaimRating::False);
        assert_eq!(claims[0].sources, vec!["NASA.gov", "[2]"]);
        assert_eq!(claims[1].rating, ClaimRating::Misleading);
    }

    #[test]
    fn test_structured_missing_claims_keeps_raw() {
        let raw = r#"{"overall_rating":"MIXED","summary":"partial"}"#;
        let err = StructuredParser.parse(raw).unwrap_err();

        match &err {
            FactCheckError::Parse { kind, message, .. } => {
                assert_eq!(*kind, ParseErrorKind::SchemaMismatch);
                assert!(message.contains("claims"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn test_structured_unknown_enum_is_schema_mismatch() {
        let raw = r#"{"overall_rating":"PANTS_ON_FIRE","summary":"","claims":[]}"#;
        let err = StructuredParser.parse(raw).unwrap_err();
        assert!(matches!(
            err,
            FactCheckError::Parse {
                kind: ParseErrorKind::SchemaMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_structured_prose_is_invalid_json() {
        let err = StructuredParser.parse("I could not check this.").unwrap_err();
        assert!(matches!(
            err,
            FactCheckError::Parse {
                kind: ParseErrorKind::InvalidJson,
                ..
            }
        ));
    }

    #[test]
    fn test_structured_skips_reasoning_block() {
        let raw = format!("<think>Let me research this.</think>\n{}", STRUCTURED);
        let verdict = StructuredParser.parse(&raw).unwrap();
        assert_eq!(verdict.response.overall_rating, OverallRating::MostlyFalse);
    }

    #[test]
    fn test_heuristic_accepts_fenced_json() {
        let raw = format!("Here is my analysis:\n```json\n{}\n```\nHope this helps.", STRUCTURED);
        let verdict = HeuristicParser::default().parse(&raw).unwrap();

        assert!(!verdict.is_low_confidence());
        assert_eq!(verdict.response.claims.len(), 2);
    }

    #[test]
    fn test_heuristic_prose_answer() {
        let raw = "\
## 🔴 Overall Rating: **MOSTLY_FALSE**

### Summary:
The statement makes two claims, one of which is false.
Atmospheric science is well settled here.

### Claims Analysis

**Claim 1:** \"The sky is green\"
- **Rating:** ❌ FALSE
- **Explanation:** Rayleigh scattering makes the daytime sky appear blue.
- **Sources:** [1], NASA.gov

Claim 2: Water boils at 100°C at sea level
Rating: TRUE
Explanation: At standard pressure water boils at 100°C.
Sources:
- https://www.nist.gov/boiling
- [2]
";
        let verdict = HeuristicParser::default().parse(raw).unwrap();
        let response = &verdict.response;

        assert!(!verdict.is_low_confidence(), "notes: {:?}", verdict.notes);
        assert_eq!(response.overall_rating, OverallRating::MostlyFalse);
        assert!(response.summary.starts_with("The statement makes two claims"));
        assert!(response.summary.contains("well settled"));
        assert!(!response.summary.contains("Claims Analysis"));

        assert_eq!(response.claims.len(), 2);
        assert_eq!(response.claims[0].claim, "The sky is green");
        assert_eq!(response.claims[0].rating, ClaimRating::False);
        assert!(response.claims[0].explanation.contains("Rayleigh"));
        assert_eq!(response.claims[0].sources, vec!["[1]", "NASA.gov"]);

        assert_eq!(response.claims[1].claim, "Water boils at 100°C at sea level");
        assert_eq!(response.claims[1].rating, ClaimRating::True);
        assert_eq!(
            response.claims[1].sources,
            vec!["https://www.nist.gov/boiling", "[2]"]
        );
    }

    #[test]
    fn test_heuristic_rating_in_claim_header() {
        let raw = "Overall rating: mostly true\n\nSummary: Fine.\n\nClaim 1: ✅ TRUE\nStatement: \"Paris is in France\"\nExplanation: It is the capital.\n";
        let verdict = HeuristicParser::default().parse(raw).unwrap();

        assert_eq!(verdict.response.overall_rating, OverallRating::MostlyTrue);
        assert_eq!(verdict.response.claims[0].rating, ClaimRating::True);
        assert_eq!(verdict.response.claims[0].claim, "Paris is in France");
    }

    #[test]
    fn test_heuristic_missing_rating_defaults_to_mixed() {
        let raw = "I looked into this and the evidence points in several directions.";
        let verdict = HeuristicParser::default().parse(raw).unwrap();

        assert_eq!(verdict.response.overall_rating, OverallRating::Mixed);
        assert!(verdict.is_low_confidence());
        assert!(verdict.notes.iter().any(|n| n.contains("confidence low")));
        assert!(verdict.response.claims.is_empty());
    }

    #[test]
    fn test_heuristic_claim_without_rating_is_unverifiable() {
        let raw = "Overall: MIXED\nSummary: Unclear.\nClaim 1: Aliens built the pyramids\nExplanation: No credible evidence either way was found.";
        let verdict = HeuristicParser::default().parse(raw).unwrap();

        assert_eq!(verdict.response.claims[0].rating, ClaimRating::Unverifiable);
        assert!(verdict.is_low_confidence());
    }

    #[test]
    fn test_custom_patterns() {
        let patterns = HeuristicPatterns {
            claim_header: Regex::new(r"(?i)^assertion\s+(\d+)\s*:\s*(.*)$").unwrap(),
            ..Default::default()
        };
        let parser = HeuristicParser::with_patterns(patterns);

        let raw = "Overall: MOSTLY_TRUE\nSummary: ok\nAssertion 1: Grass is green\nRating: TRUE";
        let verdict = parser.parse(raw).unwrap();

        assert_eq!(verdict.response.claims.len(), 1);
        assert_eq!(verdict.response.claims[0].claim, "Grass is green");
    }

    #[test]
    fn test_resolve_citation_refs() {
        let mut response = StructuredParser.parse(STRUCTURED).unwrap().response;
        response.claims[0].sources.push("[9]".into());
        response.citations = vec!["https://a.example".into(), "https://b.example".into()];

        resolve_citation_refs(&mut response);

        assert_eq!(
            response.claims[0].sources,
            vec!["NASA.gov", "https://b.example", "[9]"]
        );
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("## 🟠 **Overall Rating:** MIXED"), "Overall Rating: MIXED");
        assert_eq!(clean_line("> ⚠️ Claim 3: x"), "Claim 3: x");
        assert_eq!(clean_line("✅ a → b ≠ c"), "a → b ≠ c");
    }

    #[test]
    fn test_heuristic_keeps_math_and_arrows() {
        let raw = "Overall Rating: MIXED\nSummary: Numbers.\nClaim 1: Inflation ≤ 2% and π ≈ 3.14 → stable\nRating: ⚠️ MISLEADING\nExplanation: x ≥ y\n";
        let verdict = HeuristicParser::default().parse(raw).unwrap();
        let claim = &verdict.response.claims[0];

        assert_eq!(claim.claim, "Inflation ≤ 2% and π ≈ 3.14 → stable");
        assert_eq!(claim.rating, ClaimRating::Misleading);
        assert_eq!(claim.explanation, "x ≥ y");
    }

    #[test]
    fn test_parser_for() {
        assert!(parser_for(true).parse("not json").is_err());
        assert!(parser_for(false).parse("not json").is_ok());
    }
}
