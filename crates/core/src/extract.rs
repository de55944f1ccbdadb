//! Extractor trait: pulls readable content out of a paper's source document.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ExtractionError;

/// A titled section of extracted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// Normalized content pulled from one paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,

    /// Extractor-specific details (extraction_method, content_type, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub references: Vec<String>,

    /// URL of the paper this content belongs to (set by the pipeline)
    #[serde(default)]
    pub paper_id: String,

    #[serde(default)]
    pub paper_title: String,
}

impl ExtractedContent {
    /// The `extraction_method` recorded by the extractor, if any.
    pub fn extraction_method(&self) -> Option<&str> {
        self.metadata.get("extraction_method").and_then(|v| v.as_str())
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract_from_url(&self, url: &str) -> std::result::Result<ExtractedContent, ExtractionError>;

    /// Extract a local document. Extractors that only fetch over HTTP keep
    /// the default, which rejects every file.
    async fn extract_from_file(&self, path: &Path) -> std::result::Result<ExtractedContent, ExtractionError> {
        Err(ExtractionError::Unsupported {
            url: path.display().to_string(),
            content_type: "local file".into(),
        })
    }
}
