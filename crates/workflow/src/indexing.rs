//! Writes extracted content into the knowledge store: one paper document
//! plus one document per substantial section.
//!
//! Every store call is bounded by the per-call timeout and abandoned on
//! cancellation.

use std::sync::Arc;
use std::time::Duration;

use litscout_core::error::{Error, StoreError};
use litscout_core::extract::ExtractedContent;
use litscout_core::paper::Paper;
use litscout_core::store::{DocumentKind, DocumentMetadata, KnowledgeStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What indexing one piece of content did.
#[derive(Debug, Default)]
pub struct Indexed {
    /// The paper document produced at least one chunk.
    pub added: bool,
    pub errors: Vec<String>,
}

pub struct Indexer {
    store: Arc<dyn KnowledgeStore>,
    min_section_chars: usize,
    call_timeout: Duration,
}

impl Indexer {
    pub fn new(store: Arc<dyn KnowledgeStore>, min_section_chars: usize, call_timeout: Duration) -> Self {
        Self {
            store,
            min_section_chars,
            call_timeout,
        }
    }

    /// Index `content` under `metadata`. Store failures and timeouts are
    /// collected in [`Indexed::errors`]; only cancellation is an error.
    pub async fn index(
        &self,
        content: &ExtractedContent,
        metadata: DocumentMetadata,
        cancel: &CancellationToken,
    ) -> Result<Indexed, Error> {
        let mut outcome = Indexed::default();

        match self.add(&content.text, metadata.clone(), cancel).await? {
            Ok(ids) if !ids.is_empty() => outcome.added = true,
            Ok(_) => debug!(paper = %metadata.title, "Nothing indexed"),
            Err(e) => {
                warn!(paper = %metadata.title, error = %e, "Indexing failed");
                outcome.errors.push(format!("Indexing failed for '{}': {e}", metadata.title));
            }
        }

        for section in content
            .sections
            .iter()
            .filter(|s| s.content.chars().count() > self.min_section_chars)
        {
            let section_meta = DocumentMetadata {
                kind: DocumentKind::Section,
                section_title: Some(section.title.clone()),
                ..metadata.clone()
            };
            if let Err(e) = self.add(&section.content, section_meta, cancel).await? {
                warn!(paper = %metadata.title, section = %section.title, error = %e, "Section indexing failed");
                outcome.errors.push(format!(
                    "Indexing failed for section '{}' of '{}': {e}",
                    section.title, metadata.title
                ));
            }
        }

        Ok(outcome)
    }

    async fn add(
        &self,
        text: &str,
        metadata: DocumentMetadata,
        cancel: &CancellationToken,
    ) -> Result<Result<Vec<String>, StoreError>, Error> {
        let call = tokio::time::timeout(self.call_timeout, self.store.add_document(text, metadata));
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            added = call => Ok(added.unwrap_or(Err(StoreError::Timeout(self.call_timeout.as_secs())))),
        }
    }
}

/// Store metadata for extracted content, enriched from the discovered paper
/// when there is one.
pub fn document_metadata(content: &ExtractedContent, paper: Option<&Paper>) -> DocumentMetadata {
    let mut metadata = DocumentMetadata {
        paper_id: content.paper_id.clone(),
        title: content.paper_title.clone(),
        sections: content.sections.iter().map(|s| s.title.clone()).collect(),
        references: content.references.clone(),
        kind: DocumentKind::Paper,
        extraction_method: Some(content.extraction_method().unwrap_or("text").to_string()),
        ..DocumentMetadata::default()
    };
    if let Some(paper) = paper {
        metadata.authors = paper.authors.clone();
        metadata.venue = paper.venue.clone();
        metadata.citations = paper.citations;
        metadata.doi = paper.doi.clone();
        metadata.publication_date = paper.publication_date;
    }
    metadata
}
