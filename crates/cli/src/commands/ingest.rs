//! `litscout ingest`: Index a directory of local documents.

use std::path::Path;
use std::sync::Arc;

use litscout_config::AppConfig;
use litscout_extract::HtmlExtractor;
use litscout_workflow::Ingestor;

use super::{build_store, cancel_on_ctrl_c};

pub async fn run(config: &AppConfig, dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let extractor = Arc::new(HtmlExtractor::new(config.research.timeout)?);
    let ingestor = Ingestor::new(&config.research, store.clone(), extractor);

    let (cancel, ctrl_c) = cancel_on_ctrl_c("ingest");
    let report = ingestor.ingest_dir(dir, &cancel).await;
    ctrl_c.abort();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📥 Ingested {}", dir.display());
    println!("  Indexed:  {}", report.success_count);
    println!("  Failed:   {}", report.error_count);
    println!("  Store:    {} documents", store.count().await?);
    for error in &report.errors {
        println!("  ⚠️  {error}");
    }
    Ok(())
}
