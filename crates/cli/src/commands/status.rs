//! `litscout status`: Show the effective configuration.

use litscout_config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let enabled = |on: bool| if on { "enabled" } else { "disabled" };
    let research = &config.research;

    println!("🔬 litscout Status");
    println!("==================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Store:        {}", config.store.backend);
    if config.store.backend == "file" {
        println!("  Store path:   {}", config.store.resolved_path().display());
    }
    if config.store.embedder == "hashed" {
        println!("  Embeddings:   hashed term vectors");
    } else {
        let provider = config.store.embedding_provider.as_deref().unwrap_or(&config.default_provider);
        println!("  Embeddings:   {provider}/{}", config.store.embedding_model);
    }

    println!("\n  Sources:");
    println!("    arxiv             {}", enabled(config.sources.arxiv.enabled));
    let web_ready = config.sources.web.api_key.is_some() && config.sources.web.cse_id.is_some();
    println!(
        "    web               {}{}",
        enabled(config.sources.web.enabled),
        if config.sources.web.enabled && !web_ready { " (missing API key or CSE id)" } else { "" }
    );
    println!(
        "    semantic_scholar  {}",
        enabled(config.sources.semantic_scholar.enabled)
    );

    println!("\n  Research:");
    println!("    max papers/pass   {}", research.max_papers_per_search);
    println!("    attempts/retries  {}/{}", research.max_attempts, research.max_retries);
    println!("    timeout           {}s", research.timeout);
    println!("    request delay     {}s", research.request_delay);
    println!(
        "    skip threshold    {} relevant papers (score > {})",
        research.max_papers_per_search + research.skip_margin,
        research.relevance_threshold
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file - run `litscout onboard` first");
    }

    Ok(())
}
