//! # litscout Core
//!
//! Domain types, traits, and error definitions for the litscout research
//! pipeline. It depends only on serde, thiserror, async-trait, chrono and
//! tokio's channels, and defines the domain model that all other crates
//! implement against.
//!
//! Every collaborator of the workflow engine is a trait here (paper sources,
//! the knowledge store and its embedder, the extractor, the synthesis agent,
//! the LLM provider, progress sinks). Implementations live in their respective crates and are
//! selected via configuration; tests substitute mocks.

pub mod error;
pub mod paper;
pub mod source;
pub mod store;
pub mod embed;
pub mod extract;
pub mod synthesis;
pub mod message;
pub mod provider;
pub mod progress;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, ExtractionError, ProgressError, ProviderError, Result, SourceError, StoreError,
    SynthesisError,
};
pub use paper::Paper;
pub use source::SourceAdapter;
pub use store::{
    DocumentKind, DocumentMetadata, KnowledgeStore, ScoredDocument, StoreStatistics, StoredDocument,
};
pub use extract::{ExtractedContent, Extractor, Section};
pub use synthesis::{KeyFinding, ResearchGap, SynthesisAgent, SynthesisResult};
pub use message::{Message, Role};
pub use embed::Embedder;
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
pub use progress::{ChannelSink, FnSink, ProgressSink, ProgressUpdate};
