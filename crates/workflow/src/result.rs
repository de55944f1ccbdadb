//! The terminal record handed back by a run.

use litscout_core::paper::Paper;
use litscout_core::synthesis::SynthesisResult;
use serde::{Deserialize, Serialize};

use crate::state::{RunMetadata, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Partial results plus a non-empty errors list
    CompletedWithErrors,
    /// No results
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::CompletedWithErrors => write!(f, "completed_with_errors"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub request_id: String,
    pub query: String,
    pub status: RunStatus,
    pub papers_found: usize,
    pub content_extracted: usize,
    pub synthesis: Option<SynthesisResult>,
    pub quality_score: u8,
    pub errors: Vec<String>,
    pub metadata: RunMetadata,
    pub final_progress: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub papers: Vec<Paper>,
}

impl ResearchResult {
    /// Build the result of a run that reached `Done`.
    pub fn from_state(state: WorkflowState) -> Self {
        let status = if state.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
        Self {
            request_id: state.request_id,
            query: state.query,
            status,
            papers_found: state.papers.len(),
            content_extracted: state.contents.len(),
            synthesis: state.synthesis,
            quality_score: state.metadata.quality_score,
            errors: state.errors,
            metadata: state.metadata,
            final_progress: 100,
            papers: state.papers,
        }
    }

    /// A fatal failure: every count zeroed, no synthesis.
    pub fn failed(request_id: impl Into<String>, query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            query: query.into(),
            status: RunStatus::Failed,
            papers_found: 0,
            content_extracted: 0,
            synthesis: None,
            quality_score: 0,
            errors: vec![reason.into()],
            metadata: RunMetadata::default(),
            final_progress: 0,
            papers: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}
