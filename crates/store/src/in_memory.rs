//! In-memory store: useful for testing and ephemeral runs.

use async_trait::async_trait;
use chrono::Utc;
use litscout_core::embed::Embedder;
use litscout_core::error::StoreError;
use litscout_core::store::{
    DocumentMetadata, KnowledgeStore, ScoredDocument, StoreStatistics, StoredDocument,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::{clean_content, split_text};
use crate::vector::{HashedEmbedder, rank_documents};

/// Texts sent to the embedder per call when re-embedding stored documents.
const EMBED_BATCH: usize = 64;

/// Chunking parameters applied on insert.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// A store that keeps documents in a Vec and ranks them by cosine
/// similarity of their embeddings.
pub struct InMemoryStore {
    documents: Arc<RwLock<Vec<StoredDocument>>>,
    chunking: ChunkSettings,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_chunking(ChunkSettings::default())
    }

    pub fn with_chunking(chunking: ChunkSettings) -> Self {
        Self::from_documents(Vec::new(), chunking)
    }

    /// Start from already-stored documents (e.g. loaded from disk).
    pub fn from_documents(documents: Vec<StoredDocument>, chunking: ChunkSettings) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
            chunking,
            embedder: Arc::new(HashedEmbedder),
        }
    }

    /// Embed documents and queries with `embedder` instead of hashed term vectors.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// A snapshot of every stored document.
    pub async fn documents(&self) -> Vec<StoredDocument> {
        self.documents.read().await.clone()
    }

    /// Clean, chunk and embed `content` into documents ready for insertion.
    pub(crate) async fn prepare(
        &self,
        content: &str,
        metadata: DocumentMetadata,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        if content.trim().is_empty() {
            warn!("Empty content provided, skipping");
            return Ok(Vec::new());
        }

        let cleaned = clean_content(content);
        if cleaned.is_empty() {
            debug!(paper_id = %metadata.paper_id, "Content empty after cleaning, skipping");
            return Ok(Vec::new());
        }

        let metadata = DocumentMetadata {
            timestamp: Some(Utc::now()),
            ..metadata
        };

        let texts = if cleaned.len() > self.chunking.chunk_size {
            split_text(&cleaned, self.chunking.chunk_size, self.chunking.chunk_overlap)
        } else {
            vec![cleaned]
        };
        let embeddings = self.embed_all(&texts).await?;
        let total = texts.len();
        let chunked = total > 1;
        let model = self.embedder.name().to_string();

        Ok(texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                let mut meta = metadata.clone();
                if chunked {
                    let paper_id = if meta.paper_id.is_empty() {
                        "unknown"
                    } else {
                        meta.paper_id.as_str()
                    };
                    meta.chunk_id = Some(format!("{paper_id}_{i}"));
                    meta.chunk_index = Some(i);
                    meta.total_chunks = Some(total);
                }
                StoredDocument {
                    id: Uuid::new_v4().to_string(),
                    content: text,
                    metadata: meta,
                    embedding,
                    embedding_model: Some(model.clone()),
                }
            })
            .collect())
    }

    pub(crate) async fn insert(&self, documents: Vec<StoredDocument>) -> Vec<String> {
        let ids = documents.iter().map(|d| d.id.clone()).collect();
        self.documents.write().await.extend(documents);
        ids
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(StoreError::Embedding(format!(
                "{} returned {} vectors for {} texts",
                self.embedder.name(),
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }

    /// Re-embed documents whose vector is missing or came from another
    /// embedder. Returns how many documents changed.
    ///
    /// Documents are only ever appended, so positions stay valid while the
    /// embedder runs without the lock held.
    pub(crate) async fn refresh_stale(&self) -> Result<usize, StoreError> {
        let model = self.embedder.name().to_string();
        let stale: Vec<(usize, String)> = self
            .documents
            .read()
            .await
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.embedding.is_empty() || doc.embedding_model.as_deref() != Some(model.as_str()))
            .map(|(i, doc)| (i, doc.content.clone()))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        info!(count = stale.len(), embedder = %model, "Re-embedding stored documents");
        for batch in stale.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.embed_all(&texts).await?;
            let mut documents = self.documents.write().await;
            for ((index, _), vector) in batch.iter().zip(vectors) {
                if let Some(doc) = documents.get_mut(*index) {
                    doc.embedding = vector;
                    doc.embedding_model = Some(model.clone());
                }
            }
        }
        Ok(stale.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate figures over a document set.
pub fn compute_statistics(documents: &[StoredDocument]) -> StoreStatistics {
    let mut papers = HashSet::new();
    let mut venues: HashMap<&str, usize> = HashMap::new();
    let mut authors = HashSet::new();

    for doc in documents {
        let meta = &doc.metadata;
        if !meta.paper_id.is_empty() {
            papers.insert(meta.paper_id.as_str());
        }
        if let Some(venue) = meta.venue.as_deref().filter(|v| !v.is_empty()) {
            *venues.entry(venue).or_default() += 1;
        }
        for author in &meta.authors {
            let author = author.trim();
            if !author.is_empty() {
                authors.insert(author);
            }
        }
    }

    // Ties broken alphabetically so the answer does not depend on hash order.
    let top_venue = venues
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(venue, _)| venue.to_string());

    StoreStatistics {
        total_documents: documents.len(),
        unique_papers: papers.len(),
        top_venue,
        unique_authors: authors.len(),
    }
}

/// Membership by URL (`paper_id`) first, then DOI.
pub fn contains_paper(documents: &[StoredDocument], url: Option<&str>, doi: Option<&str>) -> bool {
    if let Some(url) = url.filter(|u| !u.is_empty()) {
        if documents.iter().any(|d| d.metadata.paper_id == url) {
            return true;
        }
    }
    if let Some(doi) = doi.filter(|d| !d.is_empty()) {
        return documents
            .iter()
            .any(|d| d.metadata.doi.as_deref().is_some_and(|stored| stored.eq_ignore_ascii_case(doi)));
    }
    false
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        self.refresh_stale().await?;
        let query_embedding = self.embedder.embed_one(query).await?;
        let documents = self.documents.read().await;
        Ok(rank_documents(&documents, &query_embedding, k))
    }

    async fn add_document(
        &self,
        content: &str,
        metadata: DocumentMetadata,
    ) -> Result<Vec<String>, StoreError> {
        let documents = self.prepare(content, metadata).await?;
        let ids = self.insert(documents).await;
        debug!(chunks = ids.len(), "Added document chunks to store");
        Ok(ids)
    }

    async fn lookup_by_url_or_doi(
        &self,
        url: Option<&str>,
        doi: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(contains_paper(&self.documents.read().await, url, doi))
    }

    async fn list_documents(&self, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self.documents.read().await.iter().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().await.len())
    }

    async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        Ok(compute_statistics(&self.documents.read().await))
    }
}
