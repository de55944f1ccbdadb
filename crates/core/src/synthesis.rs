//! SynthesisAgent trait and the structured analysis it produces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::SynthesisError;
use crate::extract::ExtractedContent;
use crate::paper::Paper;

/// One key finding drawn from the literature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFinding {
    pub finding: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Confidence level in `[0, 1]`
    #[serde(default)]
    pub confidence: f32,
    /// Titles of supporting papers
    #[serde(default)]
    pub papers: Vec<String>,
}

/// An identified gap in the research area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchGap {
    pub gap: String,
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub suggested_direction: String,
}

/// The synthesis agent's structured analysis of a paper set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub summary: String,

    #[serde(default)]
    pub key_findings: Vec<KeyFinding>,

    #[serde(default)]
    pub research_gaps: Vec<ResearchGap>,

    #[serde(default)]
    pub methodology_trends: Vec<String>,

    #[serde(default)]
    pub future_directions: Vec<String>,

    #[serde(default)]
    pub citation_network: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub timeline_insights: Vec<BTreeMap<String, String>>,

    #[serde(default)]
    pub meta_analysis: serde_json::Map<String, serde_json::Value>,
}

impl SynthesisResult {
    /// A placeholder result carrying only a diagnostic summary.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            summary: reason.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait SynthesisAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Analyse `papers` (and any freshly extracted `contents`) for `query`.
    ///
    /// `is_web_extracted` is true when the papers come from fresh discovery,
    /// false when they were rebuilt from the knowledge store.
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
        is_web_extracted: bool,
    ) -> std::result::Result<SynthesisResult, SynthesisError>;
}
