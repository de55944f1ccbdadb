//! `litscout search` / `litscout stats`: Knowledge store inspection.

use litscout_config::AppConfig;

use super::{build_store, snippet};

pub async fn search(config: &AppConfig, query: &str, k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let hits = store.similarity_search_with_scores(query, k).await?;

    println!("🔍 Knowledge store matches for: \"{query}\"\n");
    if hits.is_empty() {
        println!("   No documents found. Run `litscout research` to populate the store.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.document.metadata;
        let title = if meta.title.is_empty() { "(untitled)" } else { meta.title.as_str() };
        match &meta.section_title {
            Some(section) => println!("  {:>2}. [score: {:.2}] {title} § {section}", i + 1, hit.score),
            None => println!("  {:>2}. [score: {:.2}] {title}", i + 1, hit.score),
        }
        if !meta.paper_id.is_empty() {
            println!("      {}", meta.paper_id);
        }
        println!("      {}", snippet(&hit.document.content, 100));
    }

    Ok(())
}

pub async fn stats(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let stats = store.statistics().await?;

    println!("🧠 Knowledge Store");
    println!("==================");
    println!("  Backend:        {}", store.name());
    if config.store.backend == "file" {
        println!("  Path:           {}", config.store.resolved_path().display());
    }
    println!("  Documents:      {}", stats.total_documents);
    println!("  Unique papers:  {}", stats.unique_papers);
    println!("  Unique authors: {}", stats.unique_authors);
    println!(
        "  Top venue:      {}",
        stats.top_venue.as_deref().unwrap_or("-")
    );

    Ok(())
}
