//! `litscout research`: Run the research pipeline for one query.

use std::sync::Arc;

use litscout_config::AppConfig;
use litscout_core::progress::{FnSink, ProgressSink};
use litscout_workflow::ResearchResult;

use super::{build_engine, cancel_on_ctrl_c, snippet};

const SHOWN_PAPERS: usize = 10;

pub async fn run(
    config: &AppConfig,
    query: &str,
    max_papers: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        return Err("No LLM API key configured. Set LITSCOUT_API_KEY or run `litscout onboard`.".into());
    }

    let mut engine = build_engine(config)?;
    if let Some(max_papers) = max_papers {
        engine = engine.with_max_papers(max_papers);
    }

    let (cancel, ctrl_c) = cancel_on_ctrl_c("research run");

    if !json {
        println!("🔬 Researching: \"{query}\" (up to {} papers per pass)\n", engine.max_papers());
    }
    let printer: Option<Arc<dyn ProgressSink>> = if json {
        None
    } else {
        Some(Arc::new(FnSink(print_progress)))
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    let result = engine.run_with(&request_id, query, printer, &cancel).await;
    ctrl_c.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.is_failed() {
        return Err(format!("research failed: {}", result.errors.join("; ")).into());
    }
    Ok(())
}

fn print_progress(progress: u8, step: &str) {
    eprintln!("  [{progress:>3}%] {step}");
}

fn print_result(result: &ResearchResult) {
    println!("\n📋 Research Results");
    println!("===================");
    println!("  Request:    {}", result.request_id);
    println!("  Status:     {}", result.status);
    println!("  Papers:     {}", result.papers_found);
    println!("  Extracted:  {}", result.content_extracted);
    println!("  Quality:    {}/100", result.quality_score);
    println!("  Retries:    {}", result.metadata.retry_count);
    if result.metadata.used_existing_docs {
        println!(
            "  Source:     knowledge store ({} relevant papers)",
            result.metadata.existing_docs_found
        );
    }

    if let Some(synthesis) = &result.synthesis {
        println!("\n📝 Summary\n{}", synthesis.summary);

        print_list(
            "🔑 Key Findings",
            synthesis.key_findings.iter().map(|f| format!("{} (confidence {:.1})", f.finding, f.confidence)),
        );
        print_list(
            "🕳️  Research Gaps",
            synthesis.research_gaps.iter().map(|g| g.gap.clone()),
        );
        print_list("🧪 Methodology Trends", synthesis.methodology_trends.iter().cloned());
        print_list("🧭 Future Directions", synthesis.future_directions.iter().cloned());
    }

    if !result.papers.is_empty() {
        print_list(
            "📚 Top Papers",
            result.papers.iter().take(SHOWN_PAPERS).map(|p| {
                format!("{} [{} citations] {}", snippet(&p.title, 90), p.citations, p.url)
            }),
        );
    }

    if !result.errors.is_empty() {
        print_list("⚠️  Errors", result.errors.iter().cloned());
    }
}

fn print_list(title: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return;
    }
    println!("\n{title}");
    for (i, item) in items.iter().enumerate() {
        println!("  {:>2}. {item}", i + 1);
    }
}
