//! Bulk ingest of local documents into the knowledge store.
//!
//! Walks a directory, extracts every supported file with the configured
//! [`Extractor`] and indexes it the same way the research pipeline indexes
//! fetched papers. One bad file never stops the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use litscout_config::ResearchConfig;
use litscout_core::error::{Error, ExtractionError};
use litscout_core::extract::Extractor;
use litscout_core::store::KnowledgeStore;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::indexing::{Indexer, document_metadata};

/// Extensions picked up by a directory walk. PDFs are listed so they show
/// up in the report, even though the default extractor rejects them.
pub const INGEST_EXTENSIONS: &[&str] = &["html", "htm", "xhtml", "txt", "md", "markdown", "pdf"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    pub processed_files: Vec<String>,
}

pub struct Ingestor {
    extractor: Arc<dyn Extractor>,
    indexer: Indexer,
    call_timeout: Duration,
}

impl Ingestor {
    pub fn new(config: &ResearchConfig, store: Arc<dyn KnowledgeStore>, extractor: Arc<dyn Extractor>) -> Self {
        let call_timeout = Duration::from_secs(config.timeout);
        Self {
            extractor,
            indexer: Indexer::new(store, config.min_section_chars, call_timeout),
            call_timeout,
        }
    }

    /// Ingest every supported file under `dir`, in file-name order.
    ///
    /// Fails only when `dir` is not a directory, holds no supported files,
    /// or the run is cancelled.
    pub async fn ingest_dir(&self, dir: &Path, cancel: &CancellationToken) -> Result<IngestReport, Error> {
        if !dir.is_dir() {
            return Err(Error::InvalidInput(format!("{} is not a directory", dir.display())));
        }

        let files = collect_files(dir);
        if files.is_empty() {
            return Err(Error::InvalidInput(format!(
                "No supported files ({}) found in {}",
                INGEST_EXTENSIONS.join(", "),
                dir.display()
            )));
        }
        info!(dir = %dir.display(), files = files.len(), "Ingesting local documents");

        let mut report = IngestReport::default();
        for path in files {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let name = path.display().to_string();
            match self.ingest_file(&path, cancel).await? {
                Ok(()) => {
                    report.success_count += 1;
                    report.processed_files.push(name);
                }
                Err(reason) => {
                    warn!(file = %name, error = %reason, "Ingest failed");
                    report.error_count += 1;
                    report.errors.push(format!("{name}: {reason}"));
                }
            }
        }

        info!(
            succeeded = report.success_count,
            failed = report.error_count,
            "Ingest finished"
        );
        Ok(report)
    }

    /// Outer error is cancellation; inner error is this file's failure.
    async fn ingest_file(&self, path: &Path, cancel: &CancellationToken) -> Result<Result<(), String>, Error> {
        let extract = tokio::time::timeout(self.call_timeout, self.extractor.extract_from_file(path));
        let extracted = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            extracted = extract => extracted.unwrap_or_else(|_| Err(ExtractionError::Fetch {
                url: path.display().to_string(),
                reason: format!("timed out after {}s", self.call_timeout.as_secs()),
            })),
        };
        let mut content = match extracted {
            Ok(content) => content,
            Err(e) => return Ok(Err(e.to_string())),
        };

        if content.paper_id.is_empty() {
            content.paper_id = content
                .metadata
                .get("source_url")
                .and_then(|v| v.as_str())
                .map_or_else(|| path.display().to_string(), str::to_string);
        }
        if content.paper_title.is_empty() {
            content.paper_title = content
                .metadata
                .get("title")
                .and_then(|v| v.as_str())
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
        }

        let metadata = document_metadata(&content, None);
        let indexed = self.indexer.index(&content, metadata, cancel).await?;
        if !indexed.added {
            let reason = indexed.errors.first().cloned().unwrap_or_else(|| "nothing indexed".into());
            return Ok(Err(reason));
        }
        for error in &indexed.errors {
            debug!(file = %path.display(), error = %error, "Partial ingest");
        }
        Ok(Ok(()))
    }
}

fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| INGEST_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .map(|entry| entry.into_path())
        .collect()
}
