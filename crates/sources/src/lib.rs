//! Paper source adapters for litscout.
//!
//! Each adapter queries one external source and fails independently of the
//! others:
//! - [`ArxivSource`]: the arXiv Atom API (primary indexed archive)
//! - [`WebSearchSource`]: Google Custom Search with `citation_*` metadata
//! - [`SemanticScholarSource`]: the Semantic Scholar Graph API (opt-in)

pub mod arxiv;
pub mod http;
pub mod semantic_scholar;
pub mod web;

pub use arxiv::ArxivSource;
pub use semantic_scholar::SemanticScholarSource;
pub use web::WebSearchSource;

use litscout_config::AppConfig;
use litscout_core::error::SourceError;
use litscout_core::source::SourceAdapter;
use std::sync::Arc;
use std::time::Duration;

/// Build every source adapter named in the configuration.
///
/// Disabled adapters are still returned; the discovery coordinator skips
/// them via [`SourceAdapter::is_enabled`].
pub fn build_from_config(config: &AppConfig) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    let timeout = config.research.timeout;
    let delay = Duration::from_secs_f64(config.research.request_delay.max(0.0));
    let sources = &config.sources;

    let arxiv = ArxivSource::new(timeout)?.with_enabled(sources.arxiv.enabled);
    let web = WebSearchSource::new(
        sources.web.api_key.clone(),
        sources.web.cse_id.clone(),
        timeout,
        delay,
    )?
    .with_enabled(sources.web.enabled);
    let semantic_scholar = SemanticScholarSource::new(sources.semantic_scholar.api_key.clone(), timeout)?
        .with_enabled(sources.semantic_scholar.enabled);

    Ok(vec![Arc::new(arxiv), Arc::new(web), Arc::new(semantic_scholar)])
}
