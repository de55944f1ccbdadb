//! Lenient parsing of LLM responses.
//!
//! Models are asked for JSON but frequently wrap it in code fences or answer
//! with a numbered list instead. Every parser here accepts both.

use litscout_core::synthesis::{KeyFinding, ResearchGap};
use serde::Deserialize;

const MAX_FINDINGS: usize = 8;
const MAX_GAPS: usize = 5;

/// A finding as the prompt asks for it. Also accepts the native field names.
#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(default)]
    finding: String,
    #[serde(default)]
    evidence_level: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default, alias = "evidence")]
    supporting_points: Vec<String>,
    #[serde(default)]
    papers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawGap {
    #[serde(default)]
    gap: String,
    #[serde(default)]
    significance: String,
    #[serde(default)]
    suggested_direction: String,
}

/// Remove Markdown code fences around a response body.
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse key findings from a JSON array or, failing that, a numbered list.
pub fn parse_findings(text: &str) -> Vec<KeyFinding> {
    let body = strip_code_fences(text);
    let findings: Vec<KeyFinding> = match serde_json::from_str::<Vec<RawFinding>>(&body) {
        Ok(raw) => raw
            .into_iter()
            .filter(|f| !f.finding.trim().is_empty())
            .map(|f| KeyFinding {
                confidence: f
                    .confidence
                    .map(|c| c.clamp(0.0, 1.0))
                    .unwrap_or_else(|| confidence_for(f.evidence_level.as_deref())),
                finding: f.finding.trim().to_string(),
                evidence: f.supporting_points,
                papers: f.papers,
            })
            .collect(),
        Err(_) => list_items(&body)
            .into_iter()
            .map(|(head, details)| KeyFinding {
                finding: head,
                evidence: details,
                confidence: confidence_for(None),
                papers: Vec::new(),
            })
            .collect(),
    };
    findings.into_iter().take(MAX_FINDINGS).collect()
}

/// Parse research gaps from a JSON array or, failing that, a numbered list.
pub fn parse_gaps(text: &str) -> Vec<ResearchGap> {
    let body = strip_code_fences(text);
    let gaps: Vec<ResearchGap> = match serde_json::from_str::<Vec<RawGap>>(&body) {
        Ok(raw) => raw
            .into_iter()
            .filter(|g| !g.gap.trim().is_empty())
            .map(|g| ResearchGap {
                gap: g.gap.trim().to_string(),
                significance: g.significance,
                suggested_direction: g.suggested_direction,
            })
            .collect(),
        Err(_) => list_items(&body)
            .into_iter()
            .map(|(head, _)| ResearchGap {
                gap: head,
                significance: "Identified research opportunity".into(),
                suggested_direction: "Further investigation needed".into(),
            })
            .collect(),
    };
    gaps.into_iter().take(MAX_GAPS).collect()
}

/// One entry per non-empty line, with list markers stripped.
///
/// A JSON array of strings is accepted as well.
pub fn parse_lines(text: &str, limit: usize) -> Vec<String> {
    let body = strip_code_fences(text);
    if let Ok(items) = serde_json::from_str::<Vec<String>>(&body) {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(limit)
            .collect();
    }
    body.lines()
        .map(strip_marker)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .take(limit)
        .collect()
}

fn confidence_for(evidence_level: Option<&str>) -> f32 {
    match evidence_level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("strong") | Some("high") => 0.9,
        Some("limited") | Some("weak") | Some("low") => 0.3,
        _ => 0.6,
    }
}

/// Group a numbered or bulleted list into (item, continuation lines).
/// Lines before the first marker are ignored.
fn list_items(text: &str) -> Vec<(String, Vec<String>)> {
    let mut items: Vec<(String, Vec<String>)> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if has_marker(line) {
            let head = strip_marker(line);
            if !head.is_empty() {
                items.push((head.to_string(), Vec::new()));
            }
        } else if let Some((_, details)) = items.last_mut() {
            details.push(line.to_string());
        }
    }
    items
}

fn has_marker(line: &str) -> bool {
    if line.starts_with(['-', '*', '•']) {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
}

fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    let without_number = {
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')')) {
            &line[digits + 1..]
        } else {
            line
        }
    };
    without_number.trim_start_matches(['-', '*', '•']).trim()
}
