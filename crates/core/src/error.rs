//! Error types for the litscout domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (source, extractor, store, synthesis, provider) has its
//! own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all litscout operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Source errors ---
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    // --- Extraction errors ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Knowledge store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Synthesis errors ---
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A single paper source failed. Always transient from the pipeline's point
/// of view: the adapter contributes nothing for that round.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{source_name} returned HTTP {status}")]
    Http { source_name: String, status: u16 },

    #[error("{source_name} request failed: {reason}")]
    Network { source_name: String, reason: String },

    #[error("{source_name} timed out after {timeout_secs}s")]
    Timeout { source_name: String, timeout_secs: u64 },

    #[error("{source_name} response could not be parsed: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unsupported content type '{content_type}' at {url}")]
    Unsupported { url: String, content_type: String },

    #[error("No usable content at {0}")]
    Empty(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Store call timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("LLM call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Malformed synthesis output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// A progress sink could not accept an update.
#[derive(Debug, Clone, Error)]
#[error("Progress sink unavailable: {0}")]
pub struct ProgressError(pub String);
