//! File-backed store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded [`StoredDocument`], embedding included.
//! Documents are loaded into memory on creation and new chunks are appended
//! on every insert, so reads stay fast and writes are durable. When the
//! configured embedder changes, stale vectors are recomputed on the next
//! search and the file is rewritten once.
//!
//! Storage location: `~/.litscout/knowledge.jsonl` unless configured.

use async_trait::async_trait;
use litscout_core::embed::Embedder;
use litscout_core::error::StoreError;
use litscout_core::store::{
    DocumentMetadata, KnowledgeStore, ScoredDocument, StoreStatistics, StoredDocument,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::in_memory::{ChunkSettings, InMemoryStore};

pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
    // Serializes appends so lines from concurrent inserts never interleave.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// If the file exists, documents are loaded from it; otherwise the store
    /// starts empty and the file is created on first write.
    pub fn open(path: impl Into<PathBuf>, chunking: ChunkSettings) -> Self {
        let path = path.into();
        let documents = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = documents.len(), "File store loaded");
        Self {
            path,
            inner: InMemoryStore::from_documents(documents, chunking),
            write_lock: Mutex::new(()),
        }
    }

    /// Embed with `embedder` instead of hashed term vectors.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.inner = self.inner.with_embedder(embedder);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<StoredDocument> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<StoredDocument>(line) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted store entry");
                    None
                }
            })
            .collect()
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("Failed to create store directory: {e}")))?;
        }
        Ok(())
    }

    fn append(&self, documents: &[StoredDocument]) -> Result<(), StoreError> {
        self.ensure_parent()?;
        let content = to_jsonl(documents)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Storage(format!("Failed to open store file: {e}")))?;
        file.write_all(content.as_bytes())
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;
        Ok(())
    }

    /// Replace the file with the current in-memory documents.
    async fn rewrite(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_parent()?;
        let content = to_jsonl(&self.inner.documents().await)?;
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Storage(format!("Failed to replace store file: {e}")))?;
        Ok(())
    }
}

fn to_jsonl(documents: &[StoredDocument]) -> Result<String, StoreError> {
    let mut content = String::new();
    for doc in documents {
        let line = serde_json::to_string(doc)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize document: {e}")))?;
        content.push_str(&line);
        content.push('\n');
    }
    Ok(content)
}

#[async_trait]
impl KnowledgeStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let refreshed = self.inner.refresh_stale().await?;
        if refreshed > 0 {
            match self.rewrite().await {
                Ok(()) => info!(refreshed, path = %self.path.display(), "Persisted re-embedded documents"),
                // vectors stay correct in memory and are recomputed next time
                Err(e) => warn!(error = %e, "Failed to persist re-embedded documents"),
            }
        }
        self.inner.similarity_search_with_scores(query, k).await
    }

    async fn add_document(
        &self,
        content: &str,
        metadata: DocumentMetadata,
    ) -> Result<Vec<String>, StoreError> {
        let documents = self.inner.prepare(content, metadata).await?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.write_lock.lock().await;
        // Memory only holds what reached disk.
        self.append(&documents)?;
        Ok(self.inner.insert(documents).await)
    }

    async fn lookup_by_url_or_doi(
        &self,
        url: Option<&str>,
        doi: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.inner.lookup_by_url_or_doi(url, doi).await
    }

    async fn list_documents(&self, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.list_documents(limit).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.inner.count().await
    }

    async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        self.inner.statistics().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::HashedEmbedder;
    use tempfile::TempDir;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
            Ok(texts.iter().map(|_| vec![1.0, 1.0]).collect())
        }
    }

    fn meta(paper_id: &str) -> DocumentMetadata {
        DocumentMetadata {
            paper_id: paper_id.into(),
            ..DocumentMetadata::default()
        }
    }

    #[tokio::test]
    async fn documents_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("knowledge.jsonl");

        let store = FileStore::open(&path, ChunkSettings::default());
        let ids = store
            .add_document("Contrastive pretraining of vision encoders", meta("https://a"))
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Contrastive pretraining"));

        let reopened = FileStore::open(&path, ChunkSettings::default());
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert!(reopened.lookup_by_url_or_doi(Some("https://a"), None).await.unwrap());

        let hits = reopened
            .similarity_search_with_scores("contrastive pretraining vision", 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("absent.jsonl"), ChunkSettings::default());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupted_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knowledge.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":"1","content":"valid stored content","metadata":{"paper_id":"https://a"}}"#,
                "\nthis is not json\n",
                r#"{"id":"2","content":"also valid content","metadata":{"paper_id":"https://b"}}"#,
                "\n"
            ),
        )
        .unwrap();

        let store = FileStore::open(&path, ChunkSettings::default());
        assert_eq!(store.count().await.unwrap(), 2);
        // Embeddings are rebuilt for lines stored without one, then persisted.
        let hits = store.similarity_search_with_scores("valid stored content", 1).await.unwrap();
        assert_eq!(hits[0].document.id, "1");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("this is not json"));
        assert_eq!(raw.matches(HashedEmbedder::NAME).count(), 2);
    }

    #[tokio::test]
    async fn reembedded_vectors_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knowledge.jsonl");
        FileStore::open(&path, ChunkSettings::default())
            .add_document("Retrieval augmented generation for open-domain QA", meta("https://rag"))
            .await
            .unwrap();

        let reopened = FileStore::open(&path, ChunkSettings::default()).with_embedder(Arc::new(ConstantEmbedder));
        let hits = reopened.similarity_search_with_scores("anything", 1).await.unwrap();
        assert_eq!(hits[0].document.embedding_model.as_deref(), Some("constant"));

        let third = FileStore::open(&path, ChunkSettings::default());
        let docs = third.list_documents(10).await.unwrap();
        assert_eq!(docs[0].embedding, vec![1.0, 1.0]);
        assert_eq!(docs[0].embedding_model.as_deref(), Some("constant"));
    }
}
