//! Vector similarity utilities.
//!
//! Pure-Rust implementations of:
//! - Hashed term-frequency embeddings (no model download, deterministic),
//!   used when no embedding provider is configured
//! - Cosine similarity
//! - Top-k ranking of stored documents against a query
//!
//! Hashed vectors only measure word overlap. A paper abstract rarely scores
//! above 0.6 against a short query, so relevance thresholds tuned for
//! semantic embeddings are seldom met in this mode.

use async_trait::async_trait;
use litscout_core::embed::Embedder;
use litscout_core::error::StoreError;
use litscout_core::store::{ScoredDocument, StoredDocument};

/// Dimensionality of hashed term vectors.
pub const EMBEDDING_DIM: usize = 1024;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "we", "this", "that", "from", "as", "be",
];

/// Embed `text` as an L2-normalized hashed term-frequency vector.
///
/// Tokens are lowercase alphanumeric runs of two or more characters, minus a
/// short stop-word list. Empty input yields an all-zero vector.
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
    {
        let bucket = (fnv1a(token.as_bytes()) % EMBEDDING_DIM as u64) as usize;
        vector[bucket] += 1.0;
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Offline [`Embedder`] over [`embed_text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedEmbedder;

impl HashedEmbedder {
    pub const NAME: &'static str = "hashed-tf";
}

#[async_trait]
impl Embedder for HashedEmbedder {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }
}

// Stable across builds, so persisted embeddings stay comparable.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank documents by cosine similarity to a query embedding.
///
/// Returns the top `limit` documents, best first, with scores clamped to
/// `[0, 1]`. Documents without an embedding are skipped.
pub fn rank_documents(
    documents: &[StoredDocument],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .iter()
        .filter(|doc| !doc.embedding.is_empty())
        .map(|doc| ScoredDocument {
            score: cosine_similarity(&doc.embedding, query_embedding).clamp(0.0, 1.0),
            document: doc.clone(),
        })
        .filter(|hit| hit.score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
