//! Terminal and JSON presentation of verdicts.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::io::Write;

use crate::error::{FactCheckError, Result};
use crate::verdict::{ClaimRating, OverallRating, ParseConfidence, ParsedVerdict, VerificationResponse};

const RULE_WIDTH: usize = 60;
const NO_SUMMARY: &str = "No summary provided.";
const NO_EXPLANATION: &str = "No explanation provided.";

/// The verdict's JSON form. Best-effort parses add their confidence and notes.
#[derive(Serialize)]
struct JsonVerdict<'a> {
    #[serde(flatten)]
    response: &'a VerificationResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_confidence: Option<ParseConfidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_notes: Option<&'a [String]>,
}

/// Indented JSON of the verdict, followed by a newline.
pub fn render_json(verdict: &ParsedVerdict, out: &mut impl Write) -> Result<()> {
    let low = verdict.is_low_confidence();
    let body = JsonVerdict {
        response: &verdict.response,
        parse_confidence: low.then_some(ParseConfidence::Low),
        parse_notes: low.then_some(verdict.notes.as_slice()),
    };
    let json = serde_json::to_string_pretty(&body)
        .map_err(|e| FactCheckError::Input(format!("failed to serialize verdict: {}", e)))?;
    writeln!(out, "{}", json).map_err(write_error)
}

/// Human-readable report.
pub fn render_report(verdict: &ParsedVerdict, out: &mut impl Write) -> Result<()> {
    write_report(verdict, out).map_err(write_error)
}

fn write_report(verdict: &ParsedVerdict, out: &mut impl Write) -> std::io::Result<()> {
    let response = &verdict.response;
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "{}", rule.dimmed())?;
    writeln!(
        out,
        "{} {} {}",
        overall_icon(response.overall_rating),
        "OVERALL RATING:".bold(),
        overall_label(response.overall_rating)
    )?;
    writeln!(out, "{}", rule.dimmed())?;

    writeln!(out)?;
    writeln!(out, "{}", "Summary".bold().underline())?;
    if response.summary.trim().is_empty() {
        writeln!(out, "{}", NO_SUMMARY.italic())?;
    } else {
        writeln!(out, "{}", response.summary)?;
    }

    writeln!(out)?;
    if response.claims.is_empty() {
        writeln!(out, "{}", "No claims identified.".italic())?;
    } else {
        writeln!(out, "{}", "Claims".bold().underline())?;
        for (i, claim) in response.claims.iter().enumerate() {
            writeln!(out)?;
            writeln!(
                out,
                "{} Claim {}: {}",
                claim_icon(claim.rating),
                i + 1,
                claim_label(claim.rating)
            )?;
            writeln!(out, "  {} {}", "Statement:".bold(), claim.claim)?;
            if claim.explanation.trim().is_empty() {
                writeln!(out, "  {} {}", "Explanation:".bold(), NO_EXPLANATION.italic())?;
            } else {
                writeln!(out, "  {} {}", "Explanation:".bold(), claim.explanation)?;
            }
            if !claim.sources.is_empty() {
                writeln!(out, "  {}", "Sources:".bold())?;
                for source in &claim.sources {
                    writeln!(out, "    - {}", source)?;
                }
            }
        }
    }

    if !response.citations.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Citations".bold().underline())?;
        for (i, url) in response.citations.iter().enumerate() {
            writeln!(out, "  [{}] {}", i + 1, url.cyan())?;
        }
    }

    if verdict.is_low_confidence() {
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            "Note: the answer was not in the expected format; this verdict is a best-effort reading."
                .yellow()
        )?;
        for note in &verdict.notes {
            writeln!(out, "  - {}", note.yellow())?;
        }
    }

    Ok(())
}

fn write_error(e: std::io::Error) -> FactCheckError {
    FactCheckError::Input(format!("failed to write output: {}", e))
}

fn overall_icon(rating: OverallRating) -> &'static str {
    match rating {
        OverallRating::MostlyTrue => "✅",
        OverallRating::Mixed => "⚠️",
        OverallRating::MostlyFalse => "❌",
    }
}

fn overall_label(rating: OverallRating) -> ColoredString {
    match rating {
        OverallRating::MostlyTrue => rating.as_str().green().bold(),
        OverallRating::Mixed => rating.as_str().yellow().bold(),
        OverallRating::MostlyFalse => rating.as_str().red().bold(),
    }
}

fn claim_icon(rating: ClaimRating) -> &'static str {
    match rating {
        ClaimRating::True => "✅",
        ClaimRating::False => "❌",
        ClaimRating::Misleading => "⚠️",
        ClaimRating::Unverifiable => "❓",
    }
}

fn claim_label(rating: ClaimRating) -> ColoredString {
    match rating {
        ClaimRating::True => rating.as_str().green(),
        ClaimRating::False => rating.as_str().red(),
        ClaimRating::Misleading => rating.as_str().yellow(),
        ClaimRating::Unverifiable => rating.as_str().blue(),
    }
}
