pub mod clusters;
pub mod ingest;
pub mod onboard;
pub mod research;
pub mod status;
pub mod store;

use std::sync::Arc;

use litscout_config::AppConfig;
use litscout_core::store::KnowledgeStore;
use litscout_extract::HtmlExtractor;
use litscout_workflow::WorkflowEngine;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Scores from hashed term vectors rarely pass this.
const HASHED_SCORE_CEILING: f32 = 0.6;

/// The configured knowledge store, embedding through the configured provider
/// when one is available.
pub fn build_store(config: &AppConfig) -> Result<Arc<dyn KnowledgeStore>, Box<dyn std::error::Error>> {
    let embedder = litscout_providers::build_embedder(config)?;
    if embedder.is_none() && config.research.relevance_threshold > HASHED_SCORE_CEILING {
        tracing::warn!(
            threshold = config.research.relevance_threshold,
            "Hashed term vectors seldom reach the relevance threshold; existing-docs reuse is effectively off"
        );
    }
    Ok(litscout_store::build_from_config(&config.store, embedder))
}

/// Wire the configured sources, store, extractor and synthesis agent into an
/// engine.
pub fn build_engine(config: &AppConfig) -> Result<WorkflowEngine, Box<dyn std::error::Error>> {
    let sources = litscout_sources::build_from_config(config)?;
    let store = build_store(config)?;
    let extractor = Arc::new(HtmlExtractor::new(config.research.timeout)?);
    let synthesizer = Arc::new(litscout_synthesis::build_from_config(config)?);

    tracing::debug!(
        sources = sources.len(),
        store = store.name(),
        "Engine assembled"
    );
    Ok(WorkflowEngine::new(
        &config.research,
        sources,
        store,
        extractor,
        synthesizer,
    ))
}

/// A token cancelled on Ctrl-C. Abort the handle once the work is done.
pub fn cancel_on_ctrl_c(what: &'static str) -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling {what}");
            trigger.cancel();
        }
    });
    (cancel, handle)
}

/// First `max` characters of `text` on one line.
pub fn snippet(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    }
}
