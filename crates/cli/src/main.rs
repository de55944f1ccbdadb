//! litscout CLI: the main entry point.
//!
//! Commands:
//! - `research`: run the research pipeline for a query
//! - `ingest`: index a directory of local documents
//! - `clusters`: labelled research trends in the knowledge store
//! - `search`: similarity search over the knowledge store
//! - `stats`: knowledge store statistics
//! - `status`: show the effective configuration
//! - `onboard`: write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use litscout_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "litscout",
    about = "litscout: discover, read and synthesize academic literature",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic end to end
    Research {
        query: String,

        /// Papers to discover per pass (overrides research.max_papers_per_search)
        #[arg(short, long)]
        max_papers: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Index local HTML, text and Markdown files into the knowledge store
    Ingest {
        dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cluster stored papers into labelled research trends
    Clusters {
        /// Number of clusters to look for
        #[arg(short = 'n', long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..))]
        clusters: u16,

        /// Smallest cluster worth reporting
        #[arg(long, default_value_t = 3)]
        min_size: usize,

        /// Print the trends as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the knowledge store
    Search {
        query: String,

        /// Number of matches to show
        #[arg(short, default_value_t = 10)]
        k: usize,
    },

    /// Show knowledge store statistics
    Stats,

    /// Show the effective configuration
    Status,

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Research {
            query,
            max_papers,
            json,
        } => commands::research::run(&config, &query, max_papers, json).await?,
        Commands::Ingest { dir, json } => commands::ingest::run(&config, &dir, json).await?,
        Commands::Clusters {
            clusters,
            min_size,
            json,
        } => commands::clusters::run(&config, usize::from(clusters), min_size, json).await?,
        Commands::Search { query, k } => commands::store::search(&config, &query, k).await?,
        Commands::Stats => commands::store::stats(&config).await?,
        Commands::Status => commands::status::run(&config)?,
        Commands::Onboard => commands::onboard::run()?,
    }

    Ok(())
}

/// Logs go to stderr so `--json` output stays machine-readable.
fn init_tracing(config: &AppConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
