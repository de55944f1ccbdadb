//! End-to-end pipeline runs against scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use litscout_config::ResearchConfig;
use litscout_core::embed::Embedder;
use litscout_core::error::{ExtractionError, SourceError, StoreError, SynthesisError};
use litscout_core::extract::{ExtractedContent, Extractor, Section};
use litscout_core::paper::Paper;
use litscout_core::progress::{ChannelSink, ProgressSink, ProgressUpdate};
use litscout_core::source::SourceAdapter;
use litscout_core::store::{DocumentMetadata, KnowledgeStore};
use litscout_core::synthesis::{KeyFinding, SynthesisAgent, SynthesisResult};
use litscout_store::InMemoryStore;
use litscout_workflow::{RequestRegistry, RequestStatus, RunStatus, WorkflowEngine};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

const QUERY: &str = "retrieval augmented generation for scientific question answering";

/// Stored abstracts on the query's topic, worded differently from it.
const STORED_ABSTRACTS: &[&str] = &[
    "A dense retriever fetches passages from the biomedical literature before an LLM drafts \
     answers to clinical questions.",
    "Grounding a language model in retrieved papers reduces hallucinated answers on science \
     exam questions.",
    "Our generator conditions on an index of chemistry literature to answer researcher queries.",
];

/// Topic axes standing in for a sentence embedding model.
struct TopicEmbedder;

const TOPICS: &[&[&str]] = &[
    &["retrieval", "retriever", "retrieved", "augmented", "passages", "index", "dense", "grounding"],
    &["generation", "generator", "language", "model", "llm", "drafts"],
    &["scientific", "science", "papers", "literature", "biomedical", "chemistry", "researcher"],
    &["question", "questions", "answering", "answers", "answer", "queries"],
];

#[async_trait]
impl Embedder for TopicEmbedder {
    fn name(&self) -> &str {
        "topics"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
                TOPICS
                    .iter()
                    .map(|topic| if words.iter().any(|w| topic.contains(w)) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

/// A store already holding `n` relevant papers.
async fn stocked_store(n: usize) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new().with_embedder(Arc::new(TopicEmbedder));
    for i in 0..n {
        let meta = DocumentMetadata {
            paper_id: format!("https://stored.example/{i}"),
            title: format!("Stored paper number {i}"),
            ..DocumentMetadata::default()
        };
        store
            .add_document(STORED_ABSTRACTS[i % STORED_ABSTRACTS.len()], meta)
            .await
            .unwrap();
    }
    Arc::new(store)
}

fn paper(prefix: &str, i: usize) -> Paper {
    Paper {
        citations: (100 - i) as u32,
        ..Paper::new(
            format!("{prefix} study of retrieval augmented generation number {i}"),
            format!("https://{prefix}.example/{i}"),
            prefix,
        )
    }
}

/// Returns the next scripted batch on each call, then nothing.
struct ScriptedSource {
    name: &'static str,
    rounds: Vec<Vec<Paper>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(name: &'static str, rounds: Vec<Vec<Paper>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            rounds,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, _query: &str, count: usize) -> Result<Vec<Paper>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rounds
            .get(call)
            .map(|batch| batch.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }
}

struct FlakySource;

#[async_trait]
impl SourceAdapter for FlakySource {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn search(&self, _query: &str, _count: usize) -> Result<Vec<Paper>, SourceError> {
        Err(SourceError::Network {
            source_name: "flaky".into(),
            reason: "connection reset".into(),
        })
    }
}

#[derive(Default)]
struct StubExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl Extractor for StubExtractor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn extract_from_url(&self, url: &str) -> Result<ExtractedContent, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut metadata = serde_json::Map::new();
        metadata.insert("extraction_method".into(), "html".into());
        Ok(ExtractedContent {
            text: format!(
                "Full text retrieved from {url} describing the retrieval pipeline.\n\
                 The evaluation covers several question answering benchmarks."
            ),
            metadata,
            sections: vec![
                Section {
                    title: "Method".into(),
                    content: "The method combines a dense retriever with a generator. ".repeat(4),
                },
                Section {
                    title: "Notes".into(),
                    content: "Too short to index.".into(),
                },
            ],
            references: vec!["Lewis et al. 2020".into()],
            ..ExtractedContent::default()
        })
    }
}

#[derive(Clone, Copy)]
enum Quality {
    Full,
    Empty,
    Fails,
    Panics,
}

/// Records (papers, contents, is_web_extracted) for every call.
struct ScriptedSynthesizer {
    quality: Quality,
    calls: Mutex<Vec<(usize, usize, bool)>>,
}

impl ScriptedSynthesizer {
    fn new(quality: Quality) -> Arc<Self> {
        Arc::new(Self {
            quality,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(usize, usize, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisAgent for ScriptedSynthesizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn synthesize(
        &self,
        _query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
        is_web_extracted: bool,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((papers.len(), contents.len(), is_web_extracted));
        match self.quality {
            Quality::Full => Ok(SynthesisResult {
                summary: "a".repeat(400),
                key_findings: (0..5)
                    .map(|i| KeyFinding {
                        finding: format!("finding {i}"),
                        ..KeyFinding::default()
                    })
                    .collect(),
                methodology_trends: (0..4).map(|i| format!("trend {i}")).collect(),
                future_directions: (0..6).map(|i| format!("direction {i}")).collect(),
                ..SynthesisResult::default()
            }),
            Quality::Empty => Ok(SynthesisResult::default()),
            Quality::Fails => Err(SynthesisError::Malformed("not json".into())),
            Quality::Panics => panic!("synthesizer exploded"),
        }
    }
}

fn config(max_papers: usize) -> ResearchConfig {
    ResearchConfig {
        max_papers_per_search: max_papers,
        ..ResearchConfig::default()
    }
}

fn engine(
    config: &ResearchConfig,
    sources: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<InMemoryStore>,
    extractor: Arc<StubExtractor>,
    synthesizer: Arc<ScriptedSynthesizer>,
) -> WorkflowEngine {
    WorkflowEngine::new(config, sources, store, extractor, synthesizer)
}

fn drain(mut rx: UnboundedReceiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn assert_single_terminal(updates: &[ProgressUpdate]) {
    let terminal: Vec<_> = updates.iter().filter(|u| u.progress == 100).collect();
    assert_eq!(terminal.len(), 1, "exactly one 100 expected: {updates:?}");
    assert_eq!(updates.last().map(|u| u.progress), Some(100));
}

#[tokio::test(start_paused = true)]
async fn existing_docs_skip_discovery() {
    let store = stocked_store(65).await;

    let source = ScriptedSource::new("arxiv", vec![vec![paper("arxiv", 0)]]);
    let extractor = Arc::new(StubExtractor::default());
    let synthesizer = ScriptedSynthesizer::new(Quality::Full);
    let engine = engine(
        &config(50),
        vec![source.clone() as Arc<dyn SourceAdapter>],
        store.clone(),
        extractor.clone(),
        synthesizer.clone(),
    );

    let result = engine.run(QUERY, None).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.metadata.existing_docs_found, 65);
    assert!(result.metadata.used_existing_docs);
    assert_eq!(result.papers_found, 65);
    assert_eq!(result.content_extracted, 0);
    assert_eq!(result.quality_score, 100);
    assert_eq!(source.calls(), 0);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(synthesizer.calls(), vec![(65, 0, false)]);
    assert_eq!(store.count().await.unwrap(), 65);
}

#[tokio::test(start_paused = true)]
async fn fresh_discovery_completes_cleanly() {
    let store = Arc::new(InMemoryStore::new());
    let arxiv = ScriptedSource::new(
        "arxiv",
        vec![
            (0..4).map(|i| paper("arxiv", i)).collect(),
            (4..6).map(|i| paper("arxiv", i)).collect(),
        ],
    );
    let web = ScriptedSource::new(
        "web",
        vec![
            (0..4).map(|i| paper("web", i)).collect(),
            (4..6).map(|i| paper("web", i)).collect(),
        ],
    );
    let extractor = Arc::new(StubExtractor::default());
    let synthesizer = ScriptedSynthesizer::new(Quality::Full);
    let engine = engine(
        &config(12),
        vec![arxiv.clone() as Arc<dyn SourceAdapter>, web.clone() as Arc<dyn SourceAdapter>],
        store.clone(),
        extractor.clone(),
        synthesizer.clone(),
    );

    let (sink, rx) = ChannelSink::new();
    let result = engine.run(QUERY, Some(Arc::new(sink))).await;

    assert_eq!(result.status, RunStatus::Completed, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.papers_found, 12);
    assert_eq!(result.metadata.discovery_attempts, 2);
    assert_eq!(arxiv.calls(), 2);
    assert_eq!(web.calls(), 2);
    // extraction stops at the default limit of 10
    assert_eq!(result.content_extracted, 10);
    assert_eq!(result.metadata.documents_added, 10);
    assert_eq!(result.quality_score, 100);
    assert_eq!(result.metadata.retry_count, 0);
    assert!(!result.metadata.used_existing_docs);
    assert_eq!(synthesizer.calls(), vec![(12, 10, true)]);

    // full text plus the one long section per paper
    assert_eq!(store.count().await.unwrap(), 20);

    let sorted = result
        .papers
        .windows(2)
        .all(|w| w[0].rank_key() >= w[1].rank_key());
    assert!(sorted);

    let updates = drain(rx);
    assert_single_terminal(&updates);
    let progress: Vec<u8> = updates.iter().map(|u| u.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert_eq!(updates[0].step, "Checking existing documents");
    assert_eq!(updates.last().unwrap().step, "completed");
}

#[tokio::test(start_paused = true)]
async fn empty_discovery_retries_twice() {
    let store = Arc::new(InMemoryStore::new());
    let arxiv = ScriptedSource::new("arxiv", Vec::new());
    let web = ScriptedSource::new("web", Vec::new());
    let synthesizer = ScriptedSynthesizer::new(Quality::Empty);
    let engine = engine(
        &config(10),
        vec![arxiv.clone() as Arc<dyn SourceAdapter>, web as Arc<dyn SourceAdapter>],
        store,
        Arc::new(StubExtractor::default()),
        synthesizer.clone(),
    );

    let (sink, rx) = ChannelSink::new();
    let result = engine.run(QUERY, Some(Arc::new(sink))).await;

    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert_eq!(result.quality_score, 0);
    assert_eq!(result.metadata.retry_count, 2);
    assert_eq!(result.metadata.discovery_attempts, 15);
    assert_eq!(arxiv.calls(), 15);
    assert_eq!(result.papers_found, 0);
    assert_eq!(synthesizer.calls().len(), 3);
    assert!(result.errors.iter().any(|e| e == "Empty synthesis summary"));

    // progress drops back to the discovery weight on each retry
    let updates = drain(rx);
    assert_single_terminal(&updates);
    let rediscoveries = updates
        .iter()
        .filter(|u| u.step == "Discovering papers")
        .count();
    assert_eq!(rediscoveries, 3);
}

#[tokio::test(start_paused = true)]
async fn failing_source_does_not_block_the_other() {
    let store = Arc::new(InMemoryStore::new());
    let web = ScriptedSource::new(
        "web",
        (0..5)
            .map(|round| (round * 3..round * 3 + 3).map(|i| paper("web", i)).collect())
            .collect(),
    );
    let engine = engine(
        &config(10),
        vec![Arc::new(FlakySource) as Arc<dyn SourceAdapter>, web.clone() as Arc<dyn SourceAdapter>],
        store,
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Full),
    );

    let result = engine.run(QUERY, None).await;

    // 3 new papers per round until 10 are reached
    assert_eq!(result.metadata.discovery_attempts, 4);
    assert_eq!(result.papers_found, 12);
    assert!(result.papers.iter().all(|p| p.source == "web"));

    let source_errors: Vec<_> = result.errors.iter().filter(|e| e.starts_with("flaky")).collect();
    assert_eq!(source_errors.len(), 4);
    assert!(source_errors[0].contains("(attempt 1)"));
    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert_eq!(result.quality_score, 100);
}

#[tokio::test(start_paused = true)]
async fn low_quality_after_skip_rediscovers() {
    let store = stocked_store(25).await;
    let source = ScriptedSource::new("arxiv", Vec::new());
    let synthesizer = ScriptedSynthesizer::new(Quality::Empty);
    let engine = engine(
        &config(10),
        vec![source.clone() as Arc<dyn SourceAdapter>],
        store,
        Arc::new(StubExtractor::default()),
        synthesizer.clone(),
    );

    let result = engine.run(QUERY, None).await;

    assert_eq!(result.metadata.retry_count, 2);
    assert!(!result.metadata.used_existing_docs);
    assert!(source.calls() > 0);
    let calls = synthesizer.calls();
    assert_eq!(calls[0], (25, 0, false));
    assert!(calls[1..].iter().all(|&(_, _, web)| web));
}

#[tokio::test(start_paused = true)]
async fn synthesis_failure_degrades() {
    let source = ScriptedSource::new("arxiv", vec![(0..3).map(|i| paper("arxiv", i)).collect()]);
    let engine = engine(
        &config(3),
        vec![source as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Fails),
    );

    let result = engine.run(QUERY, None).await;

    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert!(result.errors.iter().any(|e| e.starts_with("Error during synthesis")));
    let synthesis = result.synthesis.expect("degraded synthesis");
    assert!(synthesis.summary.contains("not json"));
    assert!(synthesis.key_findings.is_empty());
    assert!(!result.metadata.synthesis_completed);
}

#[tokio::test(start_paused = true)]
async fn panic_becomes_failed_result() {
    let source = ScriptedSource::new("arxiv", vec![(0..3).map(|i| paper("arxiv", i)).collect()]);
    let engine = engine(
        &config(3),
        vec![source as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Panics),
    );

    let (sink, rx) = ChannelSink::new();
    let result = engine.run(QUERY, Some(Arc::new(sink))).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.papers_found, 0);
    assert_eq!(result.content_extracted, 0);
    assert_eq!(result.final_progress, 0);
    assert!(result.synthesis.is_none());
    assert!(result.errors[0].contains("synthesizer exploded"));

    let updates = drain(rx);
    assert_single_terminal(&updates);
    assert!(updates.last().unwrap().step.starts_with("failed: panic"));
}

#[tokio::test]
async fn cancelled_run_fails_once() {
    let engine = engine(
        &config(3),
        vec![ScriptedSource::new("arxiv", Vec::new()) as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Full),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (sink, rx) = ChannelSink::new();
    let result = engine.run_with("req-1", QUERY, Some(Arc::new(sink)), &cancel).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.errors, vec!["cancelled"]);
    let updates = drain(rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].progress, 100);
    assert_eq!(updates[0].step, "failed: cancelled");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff() {
    let engine = Arc::new(engine(
        &config(3),
        vec![ScriptedSource::new("arxiv", Vec::new()) as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Full),
    ));
    let cancel = CancellationToken::new();

    let run = {
        let engine = engine.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run_with("req-2", QUERY, None, &cancel).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let result = run.await.unwrap();
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.errors, vec!["cancelled"]);
}

/// Fails every report; the run must not notice.
struct DeadSink;

#[async_trait]
impl ProgressSink for DeadSink {
    async fn report(&self, _progress: u8, _step: &str) -> Result<(), litscout_core::error::ProgressError> {
        Err(litscout_core::error::ProgressError("receiver gone".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn broken_sink_does_not_affect_run() {
    let source = ScriptedSource::new("arxiv", vec![(0..3).map(|i| paper("arxiv", i)).collect()]);
    let engine = engine(
        &config(3),
        vec![source as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Full),
    );

    let result = engine.run(QUERY, Some(Arc::new(DeadSink))).await;
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.papers_found, 3);
}

#[tokio::test(start_paused = true)]
async fn registered_run_is_tracked() {
    let source = ScriptedSource::new("arxiv", vec![(0..3).map(|i| paper("arxiv", i)).collect()]);
    let engine = engine(
        &config(3),
        vec![source as Arc<dyn SourceAdapter>],
        Arc::new(InMemoryStore::new()),
        Arc::new(StubExtractor::default()),
        ScriptedSynthesizer::new(Quality::Full),
    );
    let registry = RequestRegistry::new(Duration::from_secs(3600));

    let (sink, rx) = ChannelSink::new();
    let result = engine
        .run_registered(&registry, QUERY, Some(Arc::new(sink)), &CancellationToken::new())
        .await;

    let record = registry.get(&result.request_id).await.expect("record");
    assert_eq!(record.status, RequestStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(record.result.unwrap().papers_found, 3);
    assert_single_terminal(&drain(rx));
}
