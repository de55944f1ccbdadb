//! SourceAdapter trait: one external paper source.
//!
//! Implementations: arXiv, web search, Semantic Scholar.
//! An adapter fails independently of its siblings; the discovery coordinator
//! treats every [`SourceError`] as transient.

use async_trait::async_trait;
use crate::error::SourceError;
use crate::paper::Paper;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short source tag (e.g., "arxiv", "web").
    fn name(&self) -> &str;

    /// Whether this adapter takes part in discovery rounds.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Return up to `count` candidate papers for `query`.
    async fn search(&self, query: &str, count: usize) -> std::result::Result<Vec<Paper>, SourceError>;
}
