//! `litscout onboard`: First-time setup.

use std::path::Path;

use litscout_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("🔬 litscout - First-Time Setup");
    println!("==============================\n");

    if write_default_config(&config_dir)? {
        let config_path = config_dir.join("config.toml");
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add your LLM API key to {} (or set LITSCOUT_API_KEY)", config_path.display());
        println!("   2. Optionally set GOOGLE_API_KEY and GOOGLE_CSE_ID for web search");
        println!("   3. Run: litscout research \"your topic\"\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_dir.join("config.toml").display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    Ok(())
}

/// Create `dir/config.toml` with defaults. Returns false if it already exists.
fn write_default_config(dir: &Path) -> std::io::Result<bool> {
    let config_path = dir.join("config.toml");
    if config_path.exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    Ok(true)
}
