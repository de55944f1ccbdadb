//! Quality gate: scores a synthesis and bounds the retry loop.

use litscout_core::synthesis::SynthesisResult;

const CHECK_POINTS: u8 = 25;
const MIN_SUMMARY_CHARS: usize = 50;
const MIN_FINDINGS: usize = 3;
const MIN_TRENDS: usize = 3;
const MIN_DIRECTIONS: usize = 5;
/// Scores below this trigger another discovery pass.
const PASSING_SCORE: u8 = 50;

pub const NO_SYNTHESIS: &str = "No synthesis result";
pub const EMPTY_SUMMARY: &str = "Empty synthesis summary";

/// Outcome of scoring one synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityReport {
    /// One of 0, 25, 50, 75, 100
    pub score: u8,
    /// Every failed check
    pub issues: Vec<String>,
    /// Set when the synthesis is missing or has no summary at all.
    pub diagnostic: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct QualityGate {
    max_retries: u32,
}

impl QualityGate {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Score a synthesis with four independent 25-point checks: summary
    /// longer than 50 characters, more than 3 key findings, more than 3
    /// methodology trends, more than 5 future directions.
    pub fn score(synthesis: Option<&SynthesisResult>) -> QualityReport {
        let Some(synthesis) = synthesis else {
            return QualityReport {
                score: 0,
                issues: vec![NO_SYNTHESIS.into()],
                diagnostic: Some(NO_SYNTHESIS),
            };
        };

        let checks = [
            (
                synthesis.summary.chars().count() > MIN_SUMMARY_CHARS,
                "Summary too short",
            ),
            (
                synthesis.key_findings.len() > MIN_FINDINGS,
                "Too few key findings",
            ),
            (
                synthesis.methodology_trends.len() > MIN_TRENDS,
                "Too few methodology trends",
            ),
            (
                synthesis.future_directions.len() > MIN_DIRECTIONS,
                "Too few future directions",
            ),
        ];

        let mut report = QualityReport::default();
        for (passed, issue) in checks {
            if passed {
                report.score += CHECK_POINTS;
            } else {
                report.issues.push(issue.into());
            }
        }
        if synthesis.summary.trim().is_empty() {
            report.diagnostic = Some(EMPTY_SUMMARY);
        }
        report
    }

    /// Whether a pass with `score` should loop back to discovery.
    pub fn should_continue(&self, score: u8, retry_count: u32) -> bool {
        score < PASSING_SCORE && retry_count < self.max_retries
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(2)
    }
}
