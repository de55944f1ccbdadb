//! Typed pipeline state threaded through the workflow stages.

use litscout_core::extract::ExtractedContent;
use litscout_core::paper::Paper;
use litscout_core::synthesis::SynthesisResult;
use serde::{Deserialize, Serialize};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CheckExisting,
    Discover,
    Extract,
    Index,
    Synthesize,
    QualityCheck,
    Done,
}

impl Step {
    /// Progress reported on entering this step.
    pub fn weight(self) -> u8 {
        match self {
            Step::CheckExisting => 10,
            Step::Discover => 25,
            Step::Extract => 45,
            Step::Index => 60,
            Step::Synthesize => 80,
            Step::QualityCheck | Step::Done => 100,
        }
    }

    /// Human-readable label used in progress reports.
    pub fn label(self) -> &'static str {
        match self {
            Step::CheckExisting => "Checking existing documents",
            Step::Discover => "Discovering papers",
            Step::Extract => "Extracting content",
            Step::Index => "Updating knowledge graph",
            Step::Synthesize => "Synthesizing results",
            Step::QualityCheck => "Checking quality",
            Step::Done => "Done",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::CheckExisting => "check_existing",
            Step::Discover => "discover",
            Step::Extract => "extract",
            Step::Index => "index",
            Step::Synthesize => "synthesize",
            Step::QualityCheck => "quality_check",
            Step::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters and flags accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Sum of the passed 25-point quality checks
    pub quality_score: u8,
    pub quality_issues: Vec<String>,
    /// Number of low-quality passes that re-entered discovery
    pub retry_count: u32,
    pub papers_found: usize,
    pub content_extracted: usize,
    pub documents_added: usize,
    /// Distinct relevant papers the store already held at the start of the run
    pub existing_docs_found: usize,
    /// The current pass synthesizes from stored content
    pub used_existing_docs: bool,
    pub synthesis_completed: bool,
    /// Discovery rounds run, summed over passes
    pub discovery_attempts: u32,
}

/// State of one in-flight research request.
///
/// Owned by the engine and mutated by one stage at a time.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub request_id: String,
    pub query: String,
    pub step: Step,
    pub progress: u8,
    pub papers: Vec<Paper>,
    pub contents: Vec<ExtractedContent>,
    pub synthesis: Option<SynthesisResult>,
    pub knowledge_graph_updated: bool,
    /// Decided once, before any discovery round
    pub skip_discovery: bool,
    /// Append-only
    pub errors: Vec<String>,
    pub metadata: RunMetadata,
}

impl WorkflowState {
    pub fn new(request_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            query: query.into(),
            step: Step::CheckExisting,
            progress: 0,
            papers: Vec::new(),
            contents: Vec::new(),
            synthesis: None,
            knowledge_graph_updated: false,
            skip_discovery: false,
            errors: Vec::new(),
            metadata: RunMetadata::default(),
        }
    }

    /// Move to `step`, setting progress to its weight.
    pub fn enter(&mut self, step: Step) {
        self.step = step;
        self.progress = step.weight();
    }
}
