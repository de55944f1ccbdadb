//! No-op store: disables the knowledge store entirely.
//!
//! Every run then does fresh discovery and nothing is indexed.

use async_trait::async_trait;
use litscout_core::error::StoreError;
use litscout_core::store::{
    DocumentMetadata, KnowledgeStore, ScoredDocument, StoreStatistics, StoredDocument,
};

/// A store that holds nothing.
pub struct NoopStore;

#[async_trait]
impl KnowledgeStore for NoopStore {
    fn name(&self) -> &str { "none" }

    async fn similarity_search_with_scores(
        &self,
        _query: &str,
        _k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        Ok(Vec::new())
    }

    async fn add_document(
        &self,
        _content: &str,
        _metadata: DocumentMetadata,
    ) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn lookup_by_url_or_doi(
        &self,
        _url: Option<&str>,
        _doi: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(false)
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
