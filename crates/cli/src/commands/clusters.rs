//! `litscout clusters`: Research trends in the knowledge store.

use litscout_config::AppConfig;
use litscout_synthesis::{TrendSettings, find_research_trends};

use super::build_store;

pub async fn run(
    config: &AppConfig,
    n_clusters: usize,
    min_size: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        return Err("No LLM API key configured. Set LITSCOUT_API_KEY or run `litscout onboard`.".into());
    }

    let store = build_store(config)?;
    let agent = litscout_synthesis::build_from_config(config)?;
    let settings = TrendSettings {
        n_clusters,
        min_cluster_size: min_size,
        ..TrendSettings::default()
    };
    let trends = find_research_trends(store.as_ref(), &agent, &settings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trends)?);
        return Ok(());
    }

    println!("📈 Research Trends");
    println!("==================");
    if trends.is_empty() {
        println!("   Not enough stored papers to find trends. Run `litscout research` or `litscout ingest` first.");
        return Ok(());
    }
    for (i, trend) in trends.iter().enumerate() {
        println!("\n  {:>2}. {} ({} papers)", i + 1, trend.label, trend.size);
        for title in &trend.papers {
            println!("      - {title}");
        }
    }
    Ok(())
}
