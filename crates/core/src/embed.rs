//! Embedder trait: turns text into vectors for knowledge-store similarity.
//!
//! Vectors from different embedders live in different spaces. Stored
//! documents remember which embedder produced their vector (see
//! [`StoredDocument::embedding_model`](crate::store::StoredDocument)) so a
//! store can tell when a vector must be recomputed.

use async_trait::async_trait;
use crate::error::StoreError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the vector space, e.g. "hashed-tf" or "openrouter/openai/text-embedding-3-small".
    fn name(&self) -> &str;

    /// Embed every text, one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, StoreError>;

    async fn embed_one(&self, text: &str) -> std::result::Result<Vec<f32>, StoreError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Embedding(format!("{} returned no vector", self.name())))
    }
}
