//! Admission control against the knowledge store.
//!
//! Before any discovery round, the store is asked how much relevant content
//! it already holds for the query. If it holds materially more distinct
//! papers than a discovery round targets, discovery and extraction are
//! skipped and synthesis runs on the stored content.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use litscout_config::ResearchConfig;
use litscout_core::paper::Paper;
use litscout_core::store::{KnowledgeStore, ScoredDocument};
use tracing::{info, warn};

/// Result of an existing-docs check.
#[derive(Debug, Clone, Default)]
pub struct ExistingDocs {
    /// One paper per retained match, rebuilt from stored metadata.
    pub papers: Vec<Paper>,
    /// Distinct non-empty paper ids among the retained matches.
    pub distinct_ids: usize,
    pub skip: bool,
}

pub struct ExistingDocsChecker {
    store: Arc<dyn KnowledgeStore>,
    k: usize,
    relevance_threshold: f32,
    max_papers: usize,
    skip_margin: usize,
    timeout: Duration,
}

impl ExistingDocsChecker {
    pub fn new(store: Arc<dyn KnowledgeStore>, config: &ResearchConfig) -> Self {
        Self {
            store,
            k: config.existing_docs_k,
            relevance_threshold: config.relevance_threshold,
            max_papers: config.max_papers_per_search,
            skip_margin: config.skip_margin,
            timeout: Duration::from_secs(config.timeout),
        }
    }

    /// Use a different discovery target than the configured one.
    pub fn with_max_papers(mut self, max_papers: usize) -> Self {
        self.max_papers = max_papers;
        self
    }

    /// Number of distinct papers required before discovery is skipped.
    pub fn skip_threshold(&self) -> usize {
        self.max_papers + self.skip_margin
    }

    /// How many matches to request. Grows with the discovery target so the
    /// skip threshold stays reachable for large targets.
    pub fn search_k(&self) -> usize {
        self.k + self.max_papers
    }

    /// Check the store for content relevant to `query`.
    ///
    /// Never fails: a store error or a search slower than the configured
    /// timeout yields an empty result with `skip = false`.
    pub async fn check(&self, query: &str) -> ExistingDocs {
        let search = self.store.similarity_search_with_scores(query, self.search_k());
        let matches = match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                warn!(error = %e, "Existing-docs check failed, continuing with discovery");
                return ExistingDocs::default();
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Existing-docs check timed out, continuing with discovery"
                );
                return ExistingDocs::default();
            }
        };

        let relevant: Vec<ScoredDocument> = matches
            .into_iter()
            .filter(|m| m.score > self.relevance_threshold)
            .collect();

        let distinct_ids = relevant
            .iter()
            .map(|m| m.document.metadata.paper_id.as_str())
            .filter(|id| !id.is_empty())
            .collect::<HashSet<_>>()
            .len();

        let skip = distinct_ids >= self.skip_threshold();
        info!(
            relevant = relevant.len(),
            distinct_ids,
            threshold = self.skip_threshold(),
            skip,
            "Existing-docs check"
        );

        ExistingDocs {
            papers: relevant.into_iter().map(paper_from_match).collect(),
            distinct_ids,
            skip,
        }
    }
}

fn paper_from_match(hit: ScoredDocument) -> Paper {
    let doc = hit.document;
    let meta = doc.metadata;
    Paper {
        title: meta.title,
        authors: meta.authors,
        abstract_text: doc.content,
        url: meta.paper_id,
        pdf_url: None,
        publication_date: meta.publication_date,
        venue: meta.venue,
        citations: meta.citations,
        doi: meta.doi,
        source: "knowledge_store".into(),
        sections: meta.sections,
        references: meta.references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litscout_core::embed::Embedder;
    use litscout_core::error::StoreError;
    use litscout_core::store::{DocumentMetadata, StoreStatistics, StoredDocument};
    use litscout_store::InMemoryStore;

    const QUERY: &str = "graph neural networks for molecular property prediction";

    /// Abstracts on the query's topic that share none of its words.
    const RELEVANT: &[&str] = &[
        "We propose a message passing architecture that learns representations of small \
         molecules and predicts solubility and toxicity directly from their chemical graphs.",
        "Equivariant GNNs trained on quantum chemistry data estimate binding affinity of \
         ligands more accurately than fingerprint baselines.",
        "A deep learning model over atom-bond graphs forecasts ADMET properties of drug \
         candidates, outperforming descriptor-based regressors on MoleculeNet.",
    ];

    const ADJACENT: &str = "Graph convolutional networks improve session-based recommendation \
                            by modelling item transitions as directed graphs.";

    const UNRELATED: &str = "Conservation of medieval tapestries: dye analysis and textile \
                             restoration practice in European museums.";

    /// Maps text onto a handful of topic axes, standing in for a sentence
    /// embedding model: paraphrases land on the same axes.
    struct TopicEmbedder;

    const TOPICS: &[&[&str]] = &[
        &["graph", "graphs", "gnn", "gnns", "message", "atom", "convolutional"],
        &["molecule", "molecules", "molecular", "chemical", "chemistry", "ligands", "drug"],
        &["property", "properties", "prediction", "predicts", "solubility", "toxicity", "binding", "forecasts", "estimate"],
        &["neural", "networks", "deep", "learning", "learns", "trained", "architecture", "model"],
        &["tapestries", "textile", "museums", "restoration", "medieval", "dye"],
        &["recommendation", "session", "item", "items"],
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
                    let words: Vec<String> = text
                        .split(|c: char| !c.is_alphanumeric())
                        .map(str::to_lowercase)
                        .collect();
                    TOPICS
                        .iter()
                        .map(|topic| {
                            if words.iter().any(|w| topic.contains(&w.as_str())) { 1.0 } else { 0.0 }
                        })
                        .collect()
                })
                .collect())
        }
    }

    fn meta(paper_id: String, title: String) -> DocumentMetadata {
        DocumentMetadata {
            paper_id,
            title,
            venue: Some("arXiv".into()),
            sections: vec!["Introduction".into()],
            ..DocumentMetadata::default()
        }
    }

    async fn fill(store: InMemoryStore, relevant: usize, unrelated: usize) -> Arc<dyn KnowledgeStore> {
        for i in 0..relevant {
            let meta = meta(format!("https://arxiv.org/pdf/{i}"), format!("Relevant paper {i}"));
            store.add_document(RELEVANT[i % RELEVANT.len()], meta).await.unwrap();
        }
        for i in 0..unrelated {
            let meta = meta(format!("https://other/{i}"), format!("Other paper {i}"));
            store.add_document(UNRELATED, meta).await.unwrap();
        }
        Arc::new(store)
    }

    async fn store_with(relevant: usize, unrelated: usize) -> Arc<dyn KnowledgeStore> {
        fill(InMemoryStore::new().with_embedder(Arc::new(TopicEmbedder)), relevant, unrelated).await
    }

    fn config(max_papers: usize) -> ResearchConfig {
        ResearchConfig {
            max_papers_per_search: max_papers,
            ..ResearchConfig::default()
        }
    }

    #[tokio::test]
    async fn skips_when_store_holds_enough() {
        let store = store_with(65, 5).await;
        let checker = ExistingDocsChecker::new(store, &config(50));
        let result = checker.check(QUERY).await;

        assert_eq!(result.distinct_ids, 65);
        assert_eq!(result.papers.len(), 65);
        assert!(result.skip);
        assert!(result.papers.iter().all(|p| p.source == "knowledge_store"));
        assert!(RELEVANT.contains(&result.papers[0].abstract_text.as_str()));
        assert_eq!(result.papers[0].sections, vec!["Introduction"]);
    }

    #[tokio::test]
    async fn below_threshold_does_not_skip() {
        let store = store_with(19, 0).await;
        let checker = ExistingDocsChecker::new(store, &config(10));
        let result = checker.check(QUERY).await;

        assert_eq!(result.distinct_ids, 19);
        assert_eq!(result.papers.len(), 19);
        assert!(!result.skip);
    }

    #[tokio::test]
    async fn exactly_at_threshold_skips() {
        let store = store_with(20, 0).await;
        let checker = ExistingDocsChecker::new(store, &config(10));
        assert!(checker.check(QUERY).await.skip);
    }

    #[tokio::test]
    async fn unrelated_content_is_ignored() {
        let store = store_with(0, 30).await;
        let checker = ExistingDocsChecker::new(store, &config(1));
        let result = checker.check(QUERY).await;
        assert_eq!(result.distinct_ids, 0);
        assert!(result.papers.is_empty());
        assert!(!result.skip);
    }

    #[tokio::test]
    async fn adjacent_topic_stays_below_relevance_threshold() {
        let store = InMemoryStore::new().with_embedder(Arc::new(TopicEmbedder));
        for i in 0..15 {
            let meta = meta(format!("https://recsys/{i}"), format!("GNN recommender {i}"));
            store.add_document(ADJACENT, meta).await.unwrap();
        }
        let checker = ExistingDocsChecker::new(Arc::new(store), &config(1));
        let result = checker.check(QUERY).await;
        assert_eq!(result.distinct_ids, 0);
        assert!(!result.skip);
    }

    #[tokio::test]
    async fn hashed_vectors_miss_paraphrased_abstracts() {
        let store = fill(InMemoryStore::new(), 30, 0).await;
        let checker = ExistingDocsChecker::new(store, &config(1));
        let result = checker.check(QUERY).await;
        assert_eq!(result.distinct_ids, 0);
        assert!(!result.skip);
    }

    #[tokio::test]
    async fn duplicate_ids_count_once() {
        let store = InMemoryStore::new().with_embedder(Arc::new(TopicEmbedder));
        for abstract_text in RELEVANT {
            let meta = meta("https://same".into(), "Same paper".into());
            store.add_document(abstract_text, meta).await.unwrap();
        }
        store.add_document(RELEVANT[0], DocumentMetadata::default()).await.unwrap();

        let checker = ExistingDocsChecker::new(Arc::new(store), &config(1)).with_max_papers(0);
        let result = checker.check(QUERY).await;
        assert_eq!(result.papers.len(), 4);
        assert_eq!(result.distinct_ids, 1);
        // threshold is 0 + 10
        assert!(!result.skip);
    }

    /// Fails every call, or hangs on search when `hang` is set.
    struct BrokenStore {
        hang: bool,
    }

    #[async_trait]
    impl KnowledgeStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        async fn similarity_search_with_scores(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<ScoredDocument>, StoreError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            Err(StoreError::QueryFailed("index offline".into()))
        }
        async fn add_document(&self, _c: &str, _m: DocumentMetadata) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Storage("read only".into()))
        }
        async fn lookup_by_url_or_doi(&self, _u: Option<&str>, _d: Option<&str>) -> Result<bool, StoreError> {
            Err(StoreError::QueryFailed("index offline".into()))
        }
        async fn list_documents(&self, _limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
            Err(StoreError::QueryFailed("index offline".into()))
        }
        async fn count(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
        async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
            Ok(StoreStatistics::default())
        }
    }

    #[tokio::test]
    async fn store_failure_fails_open() {
        let checker = ExistingDocsChecker::new(Arc::new(BrokenStore { hang: false }), &config(0));
        let result = checker.check(QUERY).await;
        assert!(!result.skip);
        assert!(result.papers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_store_times_out_and_fails_open() {
        let config = ResearchConfig {
            timeout: 5,
            ..config(0)
        };
        let checker = ExistingDocsChecker::new(Arc::new(BrokenStore { hang: true }), &config);

        let started = tokio::time::Instant::now();
        let result = checker.check(QUERY).await;
        assert!(!result.skip);
        assert!(result.papers.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
