//! Multi-source discovery with iterative widening.
//!
//! Each round widens the search (`max_results * attempt * 2`, capped), waits
//! out a linearly growing backoff, fans out to every enabled source
//! concurrently, deduplicates the batch, drops papers the knowledge store
//! already holds, and appends what is new. Rounds stop once enough papers
//! have accumulated or the attempt budget is spent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use litscout_config::ResearchConfig;
use litscout_core::error::Error;
use litscout_core::paper::Paper;
use litscout_core::source::SourceAdapter;
use litscout_core::store::KnowledgeStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dedup::dedupe;

/// Round and backoff limits for discovery.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub max_attempts: u32,
    /// Upper bound on the per-round search count across all sources
    pub search_cap: usize,
    /// Backoff before round `n` is `backoff_base * n`
    pub backoff_base: Duration,
    /// Limit on each knowledge-store lookup
    pub call_timeout: Duration,
}

impl DiscoverySettings {
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            search_cap: config.search_cap,
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            call_timeout: Duration::from_secs(config.timeout),
        }
    }

    /// Papers requested across all sources in round `attempt` (1-based).
    pub fn search_count(&self, max_results: usize, attempt: u32) -> usize {
        max_results
            .saturating_mul(attempt as usize)
            .saturating_mul(2)
            .min(self.search_cap)
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from_config(&ResearchConfig::default())
    }
}

/// What a discovery run produced.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    /// Deduplicated papers, highest ranked first
    pub papers: Vec<Paper>,
    /// One entry per failed source call
    pub errors: Vec<String>,
    /// Rounds actually run
    pub attempts: u32,
}

pub struct DiscoveryCoordinator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn KnowledgeStore>,
    settings: DiscoverySettings,
}

impl DiscoveryCoordinator {
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn KnowledgeStore>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            sources,
            store,
            settings,
        }
    }

    pub fn enabled_sources(&self) -> Vec<&Arc<dyn SourceAdapter>> {
        self.sources.iter().filter(|s| s.is_enabled()).collect()
    }

    /// Search every enabled source for up to `max_results` new papers.
    ///
    /// Source failures are recorded in [`DiscoveryOutcome::errors`] and never
    /// abort the search. The only error is [`Error::Cancelled`].
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryOutcome, Error> {
        let sources = self.enabled_sources();
        let mut outcome = DiscoveryOutcome::default();

        if sources.is_empty() {
            warn!("No enabled paper sources");
            outcome.errors.push("No enabled paper sources".into());
            return Ok(outcome);
        }

        let mut accumulated: Vec<Paper> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut attempt: u32 = 1;

        while accumulated.len() < max_results && attempt <= self.settings.max_attempts {
            let search_count = self.settings.search_count(max_results, attempt);
            let per_source = (search_count / sources.len()).max(1);
            info!(attempt, search_count, per_source, "Discovery round");

            let backoff = self.settings.backoff_base * attempt;
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }

            let calls = sources.iter().map(|source| async move {
                (source.name().to_string(), source.search(query, per_source).await)
            });
            let results = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                results = join_all(calls) => results,
            };

            let mut batch = Vec::new();
            for (name, result) in results {
                match result {
                    Ok(papers) => {
                        debug!(source = %name, count = papers.len(), "Source returned papers");
                        batch.extend(papers);
                    }
                    Err(e) => {
                        error!(source = %name, attempt, error = %e, "Source search failed");
                        outcome.errors.push(format!("{name} (attempt {attempt}): {e}"));
                    }
                }
            }

            let batch = dedupe(batch);
            let fresh = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                fresh = self.filter_existing(batch) => fresh,
            };
            let fresh_count = fresh.len();
            for paper in fresh {
                if seen_urls.insert(paper.url.clone()) {
                    accumulated.push(paper);
                }
            }

            info!(attempt, new = fresh_count, total = accumulated.len(), "Discovery round complete");
            outcome.attempts = attempt;
            attempt += 1;
        }

        outcome.papers = dedupe(accumulated);
        info!(
            papers = outcome.papers.len(),
            attempts = outcome.attempts,
            "Discovery completed"
        );
        Ok(outcome)
    }

    /// Drop papers the store already holds. A failed or timed-out lookup
    /// keeps the paper.
    async fn filter_existing(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let mut fresh = Vec::with_capacity(papers.len());
        for paper in papers {
            let url = Some(paper.url.as_str()).filter(|u| !u.is_empty());
            let lookup = self.store.lookup_by_url_or_doi(url, paper.doi.as_deref());
            match tokio::time::timeout(self.settings.call_timeout, lookup).await {
                Ok(Ok(true)) => debug!(url = %paper.url, "Already in knowledge store"),
                Ok(Ok(false)) => fresh.push(paper),
                Ok(Err(e)) => {
                    warn!(url = %paper.url, error = %e, "Store lookup failed, keeping paper");
                    fresh.push(paper);
                }
                Err(_) => {
                    warn!(url = %paper.url, "Store lookup timed out, keeping paper");
                    fresh.push(paper);
                }
            }
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litscout_core::error::{SourceError, StoreError};
    use litscout_core::store::{DocumentMetadata, ScoredDocument, StoreStatistics, StoredDocument};
    use litscout_store::InMemoryStore;
    use std::sync::Mutex;

    /// Returns `per_call` new papers per search, numbered across calls.
    struct CountingSource {
        name: &'static str,
        per_call: usize,
        calls: Mutex<Vec<usize>>,
    }

    impl CountingSource {
        fn new(name: &'static str, per_call: usize) -> Self {
            Self {
                name,
                per_call,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceAdapter for CountingSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, _query: &str, count: usize) -> Result<Vec<Paper>, SourceError> {
            let mut calls = self.calls.lock().unwrap();
            let round = calls.len();
            calls.push(count);
            Ok((0..self.per_call.min(count))
                .map(|i| {
                    Paper::new(
                        format!("{} paper number {round}-{i}", self.name),
                        format!("https://{}/{round}/{i}", self.name),
                        self.name,
                    )
                })
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SourceAdapter for FailingSource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn search(&self, _query: &str, _count: usize) -> Result<Vec<Paper>, SourceError> {
            Err(SourceError::Timeout {
                source_name: "flaky".into(),
                timeout_secs: 30,
            })
        }
    }

    struct DisabledSource;

    #[async_trait]
    impl SourceAdapter for DisabledSource {
        fn name(&self) -> &str {
            "disabled"
        }

        fn is_enabled(&self) -> bool {
            false
        }

        async fn search(&self, _query: &str, _count: usize) -> Result<Vec<Paper>, SourceError> {
            panic!("disabled sources are never searched")
        }
    }

    fn coordinator(sources: Vec<Arc<dyn SourceAdapter>>) -> DiscoveryCoordinator {
        DiscoveryCoordinator::new(sources, Arc::new(InMemoryStore::new()), DiscoverySettings::default())
    }

    #[test]
    fn search_count_widens_and_caps() {
        let settings = DiscoverySettings::default();
        assert_eq!(settings.search_count(10, 1), 20);
        assert_eq!(settings.search_count(10, 3), 60);
        assert_eq!(settings.search_count(10, 4), 75);
        assert_eq!(settings.search_count(50, 1), 75);
    }

    #[tokio::test(start_paused = true)]
    async fn widens_until_enough_papers() {
        let arxiv = Arc::new(CountingSource::new("arxiv", 3));
        let web = Arc::new(CountingSource::new("web", 3));
        let coord = coordinator(vec![
            arxiv.clone() as Arc<dyn SourceAdapter>,
            web.clone(),
            Arc::new(DisabledSource),
        ]);

        let outcome = coord.search("q", 12, &CancellationToken::new()).await.unwrap();

        // 6 papers per round, 12 wanted
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.papers.len(), 12);
        assert!(outcome.errors.is_empty());
        // per-source budget is half the round's search count
        assert_eq!(arxiv.requested(), vec![12, 24]);
        assert_eq!(web.requested(), vec![12, 24]);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_linearly() {
        let source = Arc::new(CountingSource::new("arxiv", 0));
        let coord = coordinator(vec![source.clone() as Arc<dyn SourceAdapter>]);

        let start = tokio::time::Instant::now();
        let outcome = coord.search("q", 5, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.attempts, 5);
        assert!(outcome.papers.is_empty());
        // 2 + 4 + 6 + 8 + 10 seconds
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(source.requested().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_source_does_not_block_others() {
        let good = Arc::new(CountingSource::new("arxiv", 2));
        let coord = coordinator(vec![good.clone() as Arc<dyn SourceAdapter>, Arc::new(FailingSource)]);

        let outcome = coord.search("q", 6, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.papers.len(), 6);
        assert!(outcome.papers.iter().all(|p| p.source == "arxiv"));
        assert_eq!(outcome.errors.len(), 3);
        assert!(outcome.errors[0].starts_with("flaky (attempt 1)"));
    }

    #[tokio::test(start_paused = true)]
    async fn known_papers_are_filtered() {
        let store = InMemoryStore::new();
        store
            .add_document(
                "Stored full text of an already indexed paper.",
                DocumentMetadata {
                    paper_id: "https://arxiv/0/0".into(),
                    ..DocumentMetadata::default()
                },
            )
            .await
            .unwrap();
        let coord = DiscoveryCoordinator::new(
            vec![Arc::new(CountingSource::new("arxiv", 2))],
            Arc::new(store),
            DiscoverySettings::default(),
        );

        let outcome = coord.search("q", 2, &CancellationToken::new()).await.unwrap();
        // round 1 yields one fresh paper, round 2 two more
        assert!(outcome.papers.iter().all(|p| p.url != "https://arxiv/0/0"));
        assert_eq!(outcome.papers.len(), 3);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let coord = coordinator(vec![Arc::new(CountingSource::new("arxiv", 0))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coord.search("q", 5, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    /// Never answers a lookup.
    struct StalledStore;

    #[async_trait]
    impl KnowledgeStore for StalledStore {
        fn name(&self) -> &str {
            "stalled"
        }
        async fn similarity_search_with_scores(&self, _q: &str, _k: usize) -> Result<Vec<ScoredDocument>, StoreError> {
            Ok(Vec::new())
        }
        async fn add_document(&self, _c: &str, _m: DocumentMetadata) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        async fn lookup_by_url_or_doi(&self, _u: Option<&str>, _d: Option<&str>) -> Result<bool, StoreError> {
            std::future::pending().await
        }
        async fn list_documents(&self, _limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
            Ok(Vec::new())
        }
        async fn count(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
        async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
            Ok(StoreStatistics::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_lookup_times_out_and_keeps_papers() {
        let settings = DiscoverySettings {
            call_timeout: Duration::from_secs(3),
            ..DiscoverySettings::default()
        };
        let coord = DiscoveryCoordinator::new(
            vec![Arc::new(CountingSource::new("arxiv", 2))],
            Arc::new(StalledStore),
            settings,
        );

        let start = tokio::time::Instant::now();
        let outcome = coord.search("q", 2, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.papers.len(), 2);
        assert_eq!(outcome.attempts, 1);
        // 2s backoff, then two 3s lookups
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_stalled_lookup() {
        let coord = DiscoveryCoordinator::new(
            vec![Arc::new(CountingSource::new("arxiv", 2))],
            Arc::new(StalledStore),
            DiscoverySettings::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = coord.search("q", 2, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn no_enabled_sources() {
        let coord = coordinator(vec![Arc::new(DisabledSource)]);
        let outcome = coord.search("q", 5, &CancellationToken::new()).await.unwrap();
        assert!(outcome.papers.is_empty());
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.errors.len(), 1);
    }
}
