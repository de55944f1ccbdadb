//! Knowledge-store embeddings served by an LLM provider.

use std::sync::Arc;

use async_trait::async_trait;
use litscout_config::AppConfig;
use litscout_core::embed::Embedder;
use litscout_core::error::{ProviderError, StoreError};
use litscout_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, warn};

use crate::router::build_from_config;

/// Inputs per `/embeddings` call.
const DEFAULT_BATCH_SIZE: usize = 96;

/// An [`Embedder`] that calls [`Provider::embed`].
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    name: String,
    batch_size: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: format!("{}/{}", provider.name(), model),
            provider,
            model,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let request = EmbeddingRequest {
                model: self.model.clone(),
                inputs: batch.to_vec(),
            };
            let response = self
                .provider
                .embed(request)
                .await
                .map_err(|e| StoreError::Embedding(e.to_string()))?;
            if response.embeddings.len() != batch.len() {
                return Err(StoreError::Embedding(format!(
                    "{} returned {} vectors for {} inputs",
                    self.name,
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            vectors.extend(response.embeddings);
        }
        debug!(embedder = %self.name, count = texts.len(), "Embedded texts");
        Ok(vectors)
    }
}

/// Build the embedder selected by `[store]`.
///
/// `Ok(None)` means the store should use hashed term vectors: either
/// `embedder = "hashed"` or provider mode without any API key.
pub fn build_embedder(config: &AppConfig) -> Result<Option<Arc<dyn Embedder>>, ProviderError> {
    if config.store.embedder == "hashed" {
        return Ok(None);
    }

    let name = config
        .store
        .embedding_provider
        .as_deref()
        .unwrap_or(&config.default_provider);
    let has_key = config.api_key.is_some()
        || config.providers.get(name).is_some_and(|p| p.api_key.is_some());
    if !has_key {
        warn!(provider = name, "No API key for embeddings, using hashed term vectors");
        return Ok(None);
    }

    let router = build_from_config(config)?;
    let provider = router
        .get(name)
        .ok_or_else(|| ProviderError::NotConfigured(format!("embedding provider '{name}' is not registered")))?;
    Ok(Some(Arc::new(ProviderEmbedder::new(provider, &config.store.embedding_model))))
}
