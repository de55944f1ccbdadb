//! Paper: a discovered bibliographic record.
//!
//! Papers are produced by a [`SourceAdapter`](crate::source::SourceAdapter)
//! and are read-only for the rest of a run. Identity for deduplication is the
//! normalized title; identity for knowledge-store membership is URL or DOI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single paper as returned by a source or rebuilt from the knowledge store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,

    /// Author names in publication order
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, rename = "abstract")]
    pub abstract_text: String,

    /// Canonical URL (for arXiv this is the PDF link)
    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    #[serde(default)]
    pub citations: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    /// Which source produced this record ("arxiv", "web", "knowledge_store", ...)
    #[serde(default = "default_source")]
    pub source: String,

    /// Section titles carried over from a stored document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,

    /// References carried over from a stored document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

fn default_source() -> String {
    "unknown".into()
}

impl Paper {
    /// Create a paper with the minimum identifying fields.
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            ..Self::default()
        }
    }

    /// Ranking key: citation count first, then publication date.
    ///
    /// A missing date ranks as the oldest possible date.
    pub fn rank_key(&self) -> (u32, DateTime<Utc>) {
        (
            self.citations,
            self.publication_date.unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// The URL content should be extracted from: the PDF link when present,
    /// otherwise the canonical URL.
    pub fn extraction_url(&self) -> Option<&str> {
        self.pdf_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| Some(self.url.as_str()).filter(|u| !u.is_empty()))
    }
}
