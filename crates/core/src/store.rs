//! KnowledgeStore trait: the similarity-searchable content store.
//!
//! The store plays two roles in a run:
//! - a cache, consulted before discovery to decide whether fresh search can
//!   be skipped and to filter out papers that are already indexed
//! - the index grown by the pipeline once content has been extracted

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// What a stored document represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Full text (or a chunk of it) of a paper
    #[default]
    Paper,
    /// A single section of a paper
    Section,
}

/// Typed metadata attached to every stored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Paper identity, normally its URL
    #[serde(default)]
    pub paper_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    #[serde(default)]
    pub citations: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,

    /// Section titles of the source paper
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    #[serde(default)]
    pub kind: DocumentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,

    // Set by the store when content is chunked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,

    /// When the document was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A document held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,

    /// Embedding vector used for similarity search
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,

    /// Name of the embedder that produced `embedding`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

/// A search hit with its relevance score in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: StoredDocument,
    pub score: f32,
}

/// Aggregate figures about the store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_documents: usize,
    pub unique_papers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_venue: Option<String>,
    pub unique_authors: usize,
}

/// The core KnowledgeStore trait.
///
/// Implementations: in-memory, JSONL file, none (no-op).
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "none").
    fn name(&self) -> &str;

    /// Top-`k` documents most similar to `query`, best first.
    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<ScoredDocument>, StoreError>;

    /// Add a document (chunked if long). Returns the ids of the stored chunks;
    /// empty content stores nothing.
    async fn add_document(
        &self,
        content: &str,
        metadata: DocumentMetadata,
    ) -> std::result::Result<Vec<String>, StoreError>;

    /// Whether a paper is already stored, matched by URL first, then DOI.
    ///
    /// `Ok(false)` means "not found"; `Err` means the lookup itself failed.
    async fn lookup_by_url_or_doi(
        &self,
        url: Option<&str>,
        doi: Option<&str>,
    ) -> std::result::Result<bool, StoreError>;

    /// Up to `limit` stored documents in insertion order.
    async fn list_documents(&self, limit: usize) -> std::result::Result<Vec<StoredDocument>, StoreError>;

    /// Number of stored documents (chunks).
    async fn count(&self) -> std::result::Result<usize, StoreError>;

    async fn statistics(&self) -> std::result::Result<StoreStatistics, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_defaults_to_paper_kind() {
        let meta: DocumentMetadata = serde_json::from_str(r#"{"paper_id": "https://a"}"#).unwrap();
        assert_eq!(meta.kind, DocumentKind::Paper);
        assert_eq!(meta.citations, 0);
        assert!(meta.authors.is_empty());
    }

    #[test]
    fn stored_document_serialization() {
        let doc = StoredDocument {
            id: "doc_001".into(),
            content: "Transformers for protein folding".into(),
            metadata: DocumentMetadata {
                paper_id: "https://arxiv.org/pdf/2101.00001".into(),
                kind: DocumentKind::Section,
                section_title: Some("Introduction".into()),
                ..DocumentMetadata::default()
            },
            embedding: vec![],
            embedding_model: None,
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("protein folding"));
        assert!(json.contains("\"section\""));
        assert!(!json.contains("embedding"));
    }
}
