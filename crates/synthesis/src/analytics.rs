//! Deterministic analytics over a paper set: citation network and graph,
//! publication timeline, and the meta-analysis block attached to every
//! synthesis.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use litscout_core::extract::ExtractedContent;
use litscout_core::paper::Paper;
use serde_json::{Map, Value, json};

const MAX_HIGHLY_CITED: usize = 10;
const MAX_VENUES: usize = 10;
const MAX_LISTED_AUTHORS: usize = 3;
/// References per paper scanned for graph edges.
const MAX_GRAPH_REFERENCES: usize = 10;
/// Titles shorter than this match too many references to be useful.
const MIN_MATCH_TITLE_CHARS: usize = 12;

/// Papers with distinct URLs, first occurrence wins. Papers without a URL
/// are always kept.
pub fn unique_papers(papers: &[Paper]) -> Vec<&Paper> {
    let mut seen = HashSet::new();
    papers
        .iter()
        .filter(|p| p.url.is_empty() || seen.insert(p.url.as_str()))
        .collect()
}

/// The most cited papers, aggregate citation statistics and the citation
/// graph. References come from the paper itself, or failing that from the
/// extracted content with the same paper id.
///
/// Returns an empty map for an empty paper set.
pub fn citation_network(papers: &[&Paper], contents: &[ExtractedContent]) -> Map<String, Value> {
    let mut network = Map::new();
    if papers.is_empty() {
        return network;
    }

    let mut sorted: Vec<&Paper> = papers.to_vec();
    sorted.sort_by(|a, b| b.citations.cmp(&a.citations));

    let highly_cited: Vec<Value> = sorted
        .iter()
        .take(MAX_HIGHLY_CITED)
        .filter(|p| p.citations > 0)
        .map(|p| {
            json!({
                "title": p.title,
                "citations": p.citations,
                "authors": p.authors.iter().take(MAX_LISTED_AUTHORS).collect::<Vec<_>>(),
                "venue": p.venue.as_deref().unwrap_or("Unknown"),
            })
        })
        .collect();

    let total: u64 = papers.iter().map(|p| u64::from(p.citations)).sum();
    let max = papers.iter().map(|p| p.citations).max().unwrap_or(0);
    let with_citations = papers.iter().filter(|p| p.citations > 0).count();

    network.insert("highly_cited_papers".into(), Value::Array(highly_cited));
    network.insert(
        "citation_stats".into(),
        json!({
            "average_citations": round_to(total as f64 / papers.len() as f64, 2),
            "max_citations": max,
            "total_citations": total,
            "papers_with_citations": with_citations,
        }),
    );
    network.insert("graph".into(), citation_graph(papers, contents));
    network
}

/// Nodes for every paper and an edge wherever one of a paper's first
/// references contains another paper's title.
pub fn citation_graph(papers: &[&Paper], contents: &[ExtractedContent]) -> Value {
    let ids: Vec<String> = papers
        .iter()
        .enumerate()
        .map(|(i, p)| if p.url.is_empty() { format!("paper-{i}") } else { p.url.clone() })
        .collect();

    let nodes: Vec<Value> = papers
        .iter()
        .zip(&ids)
        .map(|(p, id)| {
            json!({
                "id": id,
                "title": p.title,
                "authors": p.authors.iter().take(MAX_LISTED_AUTHORS).collect::<Vec<_>>(),
                "citations": p.citations,
                "venue": p.venue.as_deref().unwrap_or("Unknown"),
                "year": p.publication_date.map(|d| d.year()),
                "size": (f64::from(p.citations) / 10.0).min(50.0) + 10.0,
            })
        })
        .collect();

    let titles: Vec<String> = papers.iter().map(|p| p.title.trim().to_lowercase()).collect();
    let mut edges = Vec::new();
    for (i, paper) in papers.iter().enumerate() {
        for reference in references_for(paper, contents).iter().take(MAX_GRAPH_REFERENCES) {
            let reference = reference.to_lowercase();
            let cited = titles.iter().enumerate().find(|(j, title)| {
                *j != i && title.chars().count() >= MIN_MATCH_TITLE_CHARS && reference.contains(title.as_str())
            });
            if let Some((j, _)) = cited {
                if ids[i] != ids[j] {
                    edges.push(json!({ "source": ids[i], "target": ids[j], "type": "citation" }));
                }
            }
        }
    }

    let n = nodes.len();
    let density = if n > 1 {
        round_to(edges.len() as f64 / (n * (n - 1)) as f64, 4)
    } else {
        0.0
    };

    json!({
        "statistics": { "total_nodes": n, "total_edges": edges.len(), "density": density },
        "nodes": nodes,
        "edges": edges,
    })
}

fn references_for<'a>(paper: &'a Paper, contents: &'a [ExtractedContent]) -> &'a [String] {
    if !paper.references.is_empty() || paper.url.is_empty() {
        return &paper.references;
    }
    contents
        .iter()
        .find(|c| c.paper_id == paper.url)
        .map_or(&paper.references, |c| &c.references)
}

/// Publication-activity trends derived from paper dates.
///
/// With three or more distinct years, the average output of the last three
/// years is compared against the earliest years: above 1.5x is growth,
/// below 0.7x is decline. The peak year is always reported when any date is
/// known.
pub fn timeline_insights(papers: &[&Paper]) -> Vec<BTreeMap<String, String>> {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for date in papers.iter().filter_map(|p| p.publication_date) {
        *per_year.entry(date.year()).or_default() += 1;
    }

    if per_year.is_empty() {
        return vec![insight(
            "Insufficient temporal data",
            "Publication dates not available",
        )];
    }

    let years: Vec<i32> = per_year.keys().copied().collect();
    let mut insights = Vec::new();

    if years.len() >= 3 {
        let recent = &years[years.len() - 3..];
        let early = if years.len() > 3 {
            &years[..3]
        } else {
            &years[..years.len() - 1]
        };
        let average = |ys: &[i32]| ys.iter().map(|y| per_year[y] as f64).sum::<f64>() / ys.len() as f64;
        let recent_avg = average(recent);
        let early_avg = average(early);

        let entry = if recent_avg > early_avg * 1.5 {
            insight(
                "Increasing Research Activity",
                format!(
                    "Research activity has increased significantly in recent years ({}-{})",
                    recent[0],
                    recent[recent.len() - 1]
                ),
            )
        } else if recent_avg < early_avg * 0.7 {
            insight(
                "Declining Research Activity",
                "Research activity has declined in recent years",
            )
        } else {
            insight(
                "Stable Research Activity",
                "Research activity has remained relatively stable",
            )
        };
        insights.push(entry);
    }

    // Earliest year wins ties.
    let (peak_year, peak_count) = per_year
        .iter()
        .fold((0, 0), |best, (&year, &count)| if count > best.1 { (year, count) } else { best });
    insights.push(insight(
        "Peak Research Year",
        format!("{peak_year} had the highest number of publications ({peak_count} papers)"),
    ));

    insights
}

/// Counts and distributions summarising the analysed corpus.
///
/// `unique_count` papers are attributed to either freshly extracted web
/// content or the local knowledge store, depending on `is_web_extracted`.
pub fn meta_analysis(papers: &[Paper], unique_count: usize, is_web_extracted: bool) -> Map<String, Value> {
    let (local, web) = if is_web_extracted {
        (0, unique_count)
    } else {
        (unique_count, 0)
    };
    let total_citations: u64 = papers.iter().map(|p| u64::from(p.citations)).sum();
    let avg_citations = total_citations as f64 / papers.len().max(1) as f64;

    let mut meta = Map::new();
    meta.insert("local_papers".into(), json!(local));
    meta.insert("web_extracted_content".into(), json!(web));
    meta.insert("avg_citations".into(), json!(avg_citations));
    meta.insert("date_range".into(), date_range(papers));
    meta.insert("top_venues".into(), top_venues(papers));
    meta
}

fn date_range(papers: &[Paper]) -> Value {
    let dates: Vec<DateTime<Utc>> = papers.iter().filter_map(|p| p.publication_date).collect();
    match (dates.iter().min(), dates.iter().max()) {
        (Some(earliest), Some(latest)) => {
            let span_years = (*latest - *earliest).num_days() as f64 / 365.25;
            json!({
                "earliest": earliest.format("%Y-%m-%d").to_string(),
                "latest": latest.format("%Y-%m-%d").to_string(),
                "span_years": round_to(span_years, 1),
            })
        }
        _ => json!({ "earliest": "Unknown", "latest": "Unknown", "span_years": 0 }),
    }
}

fn top_venues(papers: &[Paper]) -> Value {
    // Insertion order is kept so equal counts rank by first appearance.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for venue in papers
        .iter()
        .filter_map(|p| p.venue.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        match counts.iter_mut().find(|(name, _)| *name == venue) {
            Some((_, count)) => *count += 1,
            None => counts.push((venue, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total = papers.len().max(1) as f64;
    Value::Array(
        counts
            .into_iter()
            .take(MAX_VENUES)
            .map(|(venue, count)| {
                json!({
                    "venue": venue,
                    "count": count,
                    "percentage": round_to(count as f64 / total * 100.0, 1),
                })
            })
            .collect(),
    )
}

fn insight(trend: impl Into<String>, description: impl Into<String>) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("trend".to_string(), trend.into()),
        ("description".to_string(), description.into()),
    ])
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
