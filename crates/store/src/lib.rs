//! Knowledge store implementations for litscout.

pub mod chunking;
pub mod file;
pub mod in_memory;
pub mod noop;
pub mod vector;

pub use file::FileStore;
pub use in_memory::{ChunkSettings, InMemoryStore};
pub use noop::NoopStore;
pub use vector::{HashedEmbedder, cosine_similarity, embed_text};

use litscout_config::StoreConfig;
use litscout_core::{Embedder, KnowledgeStore};
use std::sync::Arc;

/// Build the configured store backend.
///
/// Without an `embedder` the store falls back to hashed term vectors.
pub fn build_from_config(config: &StoreConfig, embedder: Option<Arc<dyn Embedder>>) -> Arc<dyn KnowledgeStore> {
    let chunking = ChunkSettings {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    };
    let embedder = embedder.unwrap_or_else(|| Arc::new(HashedEmbedder));
    match config.backend.as_str() {
        "memory" => Arc::new(InMemoryStore::with_chunking(chunking).with_embedder(embedder)),
        "none" => Arc::new(NoopStore),
        _ => Arc::new(FileStore::open(config.resolved_path(), chunking).with_embedder(embedder)),
    }
}
