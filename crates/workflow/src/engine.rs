//! The workflow engine: drives one research request through the pipeline.
//!
//! ```text
//! CheckExisting ─┬─> Discover ─> Extract ─> Index ─> Synthesize ─> QualityCheck ─┬─> Done
//!                └─(skip)──────> Extract ─> ...                      ^           │
//!                                                                    └─ Discover <┘ (retry)
//! ```
//!
//! Every stage handles its own failures and records them in
//! [`WorkflowState::errors`]. Only cancellation and panics escape a stage;
//! [`WorkflowEngine::run_with`] turns those into a `failed` result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use litscout_config::ResearchConfig;
use litscout_core::error::{Error, ExtractionError};
use litscout_core::extract::{ExtractedContent, Extractor};
use litscout_core::paper::Paper;
use litscout_core::progress::ProgressSink;
use litscout_core::source::SourceAdapter;
use litscout_core::store::KnowledgeStore;
use litscout_core::synthesis::{SynthesisAgent, SynthesisResult};
use litscout_discovery::{DiscoveryCoordinator, DiscoverySettings, ExistingDocsChecker};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::indexing::{Indexer, document_metadata};
use crate::progress::{ProgressReporter, interpolate};
use crate::quality::QualityGate;
use crate::registry::RequestRegistry;
use crate::result::ResearchResult;
use crate::state::{Step, WorkflowState};
use crate::transition::next_step;

pub struct WorkflowEngine {
    checker: ExistingDocsChecker,
    discovery: DiscoveryCoordinator,
    indexer: Indexer,
    extractor: Arc<dyn Extractor>,
    synthesizer: Arc<dyn SynthesisAgent>,
    gate: QualityGate,
    max_papers: usize,
    extraction_limit: usize,
    call_timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(
        config: &ResearchConfig,
        sources: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn KnowledgeStore>,
        extractor: Arc<dyn Extractor>,
        synthesizer: Arc<dyn SynthesisAgent>,
    ) -> Self {
        Self {
            checker: ExistingDocsChecker::new(store.clone(), config),
            discovery: DiscoveryCoordinator::new(
                sources,
                store.clone(),
                DiscoverySettings::from_config(config),
            ),
            indexer: Indexer::new(store, config.min_section_chars, Duration::from_secs(config.timeout)),
            extractor,
            synthesizer,
            gate: QualityGate::new(config.max_retries),
            max_papers: config.max_papers_per_search,
            extraction_limit: config.extraction_limit,
            call_timeout: Duration::from_secs(config.timeout),
        }
    }

    /// Override the per-pass discovery target.
    pub fn with_max_papers(mut self, max_papers: usize) -> Self {
        self.max_papers = max_papers;
        self.checker = self.checker.with_max_papers(max_papers);
        self
    }

    pub fn max_papers(&self) -> usize {
        self.max_papers
    }

    /// Run one request with a fresh id and no cancellation.
    pub async fn run(&self, query: &str, sink: Option<Arc<dyn ProgressSink>>) -> ResearchResult {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.run_with(&request_id, query, sink, &CancellationToken::new()).await
    }

    /// Run one request to completion.
    ///
    /// Never fails: fatal errors, panics and cancellation all produce a
    /// `failed` result. The sink sees progress `100` exactly once, as its
    /// last update.
    pub async fn run_with(
        &self,
        request_id: &str,
        query: &str,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: &CancellationToken,
    ) -> ResearchResult {
        let reporter = ProgressReporter::new(sink);
        info!(request_id, query, "Research run started");

        let outcome = AssertUnwindSafe(self.execute(request_id, query, &reporter, cancel))
            .catch_unwind()
            .await;

        let reason = match outcome {
            Ok(Ok(state)) => {
                let result = ResearchResult::from_state(state);
                info!(
                    request_id,
                    status = %result.status,
                    papers = result.papers_found,
                    quality_score = result.quality_score,
                    errors = result.errors.len(),
                    "Research run finished"
                );
                reporter.finish(&result.status.to_string()).await;
                return result;
            }
            Ok(Err(Error::Cancelled)) => "cancelled".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic: {}", panic_message(&*payload)),
        };

        error!(request_id, reason = %reason, "Research run failed");
        reporter.finish(&format!("failed: {reason}")).await;
        ResearchResult::failed(request_id, query, reason)
    }

    /// Run a request tracked in `registry`, forwarding progress to `sink`.
    pub async fn run_registered(
        &self,
        registry: &RequestRegistry,
        query: &str,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: &CancellationToken,
    ) -> ResearchResult {
        let request_id = registry.start(query).await;
        let tracked = registry.sink(&request_id).forwarding(sink);
        let result = self
            .run_with(&request_id, query, Some(Arc::new(tracked)), cancel)
            .await;
        registry.complete(&request_id, result.clone()).await;
        result
    }

    async fn execute(
        &self,
        request_id: &str,
        query: &str,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<WorkflowState, Error> {
        let mut state = WorkflowState::new(request_id, query);
        let mut step = Step::CheckExisting;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if step == Step::Done {
                state.step = Step::Done;
                break;
            }

            state.enter(step);
            reporter.report(state.progress, step.label()).await;
            debug!(request_id, %step, "Entering step");

            match step {
                Step::CheckExisting => self.check_existing(&mut state, cancel).await?,
                Step::Discover => self.discover(&mut state, cancel).await?,
                Step::Extract => self.extract(&mut state, reporter, cancel).await?,
                Step::Index => self.index(&mut state, reporter, cancel).await?,
                Step::Synthesize => self.synthesize(&mut state, cancel).await?,
                Step::QualityCheck => self.quality_check(&mut state),
                Step::Done => {}
            }

            let next = next_step(step, &state, &self.gate);
            if step == Step::QualityCheck && next == Step::Discover {
                state.metadata.retry_count += 1;
                info!(
                    request_id,
                    retry = state.metadata.retry_count,
                    quality_score = state.metadata.quality_score,
                    "Quality below threshold, rediscovering"
                );
            }
            step = next;
        }

        Ok(state)
    }

    async fn check_existing(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<(), Error> {
        let existing = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            existing = self.checker.check(&state.query) => existing,
        };
        state.metadata.existing_docs_found = existing.distinct_ids;
        state.skip_discovery = existing.skip;

        if existing.skip {
            info!(
                distinct = existing.distinct_ids,
                papers = existing.papers.len(),
                "Using existing knowledge store content"
            );
            state.papers = existing.papers;
            state.metadata.papers_found = state.papers.len();
            state.metadata.used_existing_docs = true;
        }
        Ok(())
    }

    async fn discover(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<(), Error> {
        // a retry after a stored-content pass switches to fresh discovery
        state.metadata.used_existing_docs = false;

        let outcome = self.discovery.search(&state.query, self.max_papers, cancel).await?;
        state.metadata.discovery_attempts += outcome.attempts;
        state.errors.extend(outcome.errors);
        state.papers = outcome.papers;
        state.contents.clear();
        state.metadata.papers_found = state.papers.len();
        info!(papers = state.papers.len(), attempts = outcome.attempts, "Discovery stage done");
        Ok(())
    }

    async fn extract(
        &self,
        state: &mut WorkflowState,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if state.metadata.used_existing_docs {
            debug!("Extraction skipped, synthesizing from stored content");
            return Ok(());
        }

        let total = state.papers.len();
        let mut contents = Vec::new();

        for (i, paper) in state.papers.iter().enumerate() {
            if contents.len() >= self.extraction_limit {
                debug!(limit = self.extraction_limit, "Extraction limit reached");
                break;
            }

            let extracted = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                extracted = self.extract_paper(paper) => extracted,
            };
            match extracted {
                Ok(mut content) => {
                    content.paper_id = paper.url.clone();
                    content.paper_title = paper.title.clone();
                    contents.push(content);
                }
                Err(e) => {
                    warn!(title = %paper.title, error = %e, "Extraction failed");
                    state.errors.push(format!("Extraction failed for '{}': {e}", paper.title));
                }
            }

            let progress = interpolate(Step::Extract.weight(), Step::Index.weight(), i + 1, total);
            reporter.report(progress, Step::Extract.label()).await;
        }

        info!(extracted = contents.len(), papers = total, "Extraction stage done");
        state.metadata.content_extracted = contents.len();
        state.contents = contents;
        Ok(())
    }

    /// Try the PDF link first, then the canonical URL.
    async fn extract_paper(&self, paper: &Paper) -> Result<ExtractedContent, ExtractionError> {
        let mut candidates: Vec<&str> = Vec::with_capacity(2);
        if let Some(pdf) = paper.pdf_url.as_deref().filter(|u| !u.is_empty()) {
            candidates.push(pdf);
        }
        if !paper.url.is_empty() && !candidates.contains(&paper.url.as_str()) {
            candidates.push(&paper.url);
        }

        let mut last_error = ExtractionError::Empty(format!("no URL for '{}'", paper.title));
        for url in candidates {
            match tokio::time::timeout(self.call_timeout, self.extractor.extract_from_url(url)).await {
                Ok(Ok(content)) => return Ok(content),
                Ok(Err(e)) => {
                    debug!(url, error = %e, "Extraction attempt failed");
                    last_error = e;
                }
                Err(_) => {
                    last_error = ExtractionError::Fetch {
                        url: url.to_string(),
                        reason: format!("timed out after {}s", self.call_timeout.as_secs()),
                    };
                }
            }
        }
        Err(last_error)
    }

    async fn index(
        &self,
        state: &mut WorkflowState,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if state.metadata.used_existing_docs {
            debug!("Indexing skipped, synthesizing from stored content");
            return Ok(());
        }

        let total = state.contents.len();
        let mut added = 0;
        let mut failed = false;

        for (i, content) in state.contents.iter().enumerate() {
            let paper = state.papers.iter().find(|p| p.url == content.paper_id);
            let outcome = self
                .indexer
                .index(content, document_metadata(content, paper), cancel)
                .await?;
            if outcome.added {
                added += 1;
            }
            failed |= !outcome.errors.is_empty();
            state.errors.extend(outcome.errors);

            let progress = interpolate(Step::Index.weight(), Step::Synthesize.weight(), i + 1, total);
            reporter.report(progress, Step::Index.label()).await;
        }

        state.knowledge_graph_updated = !failed;
        state.metadata.documents_added = added;
        info!(added, total, "Knowledge store updated");
        Ok(())
    }

    async fn synthesize(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<(), Error> {
        let from_store = state.metadata.used_existing_docs;
        let contents: &[ExtractedContent] = if from_store { &[] } else { &state.contents };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = self.synthesizer.synthesize(&state.query, &state.papers, contents, !from_store) => outcome,
        };

        match outcome {
            Ok(synthesis) => {
                state.synthesis = Some(synthesis);
                state.metadata.synthesis_completed = true;
                info!(agent = self.synthesizer.name(), "Synthesis completed");
            }
            Err(e) => {
                let message = format!("Error during synthesis: {e}");
                error!(agent = self.synthesizer.name(), error = %e, "Synthesis failed");
                state.errors.push(message.clone());
                state.synthesis = Some(SynthesisResult::degraded(message));
                state.metadata.synthesis_completed = false;
            }
        }
        Ok(())
    }

    fn quality_check(&self, state: &mut WorkflowState) {
        let report = QualityGate::score(state.synthesis.as_ref());
        info!(score = report.score, issues = ?report.issues, "Quality check");
        state.metadata.quality_score = report.score;
        state.metadata.quality_issues = report.issues;
        if let Some(diagnostic) = report.diagnostic {
            state.errors.push(diagnostic.to_string());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
