//! Research-trend discovery over the knowledge store.
//!
//! Stored papers are turned into TF-IDF vectors (unigrams and bigrams,
//! English stop words removed), grouped with seeded k-means++ and each
//! sufficiently large cluster is named by the LLM. Clustering is
//! deterministic for a given store.

use std::collections::{HashMap, HashSet};

use litscout_core::error::StoreError;
use litscout_core::store::{DocumentKind, KnowledgeStore, StoredDocument};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::LlmSynthesisAgent;

const SEED: u64 = 42;
const N_INIT: usize = 10;
const MAX_ITERATIONS: usize = 300;
const MAX_FEATURES: usize = 5000;
/// Terms must occur in at least this many papers.
const MIN_DF: usize = 2;
/// Terms in more than this share of papers carry no signal.
const MAX_DF: f64 = 0.95;
const FALLBACK_LABEL_TERMS: usize = 3;
const LISTED_TITLES: usize = 10;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "however", "i", "if", "in", "into",
    "is", "it", "its", "itself", "may", "me", "more", "most", "my", "no", "nor", "not", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "until", "up", "us", "very", "via", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours",
];

#[derive(Debug, Clone)]
pub struct TrendSettings {
    pub n_clusters: usize,
    /// Smaller clusters are dropped.
    pub min_cluster_size: usize,
    /// Stored documents read from the store.
    pub max_documents: usize,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            min_cluster_size: 3,
            max_documents: 1000,
        }
    }
}

/// One research theme found in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchTrend {
    pub label: String,
    pub size: usize,
    /// Titles of up to ten member papers.
    pub papers: Vec<String>,
}

/// One stored paper: its title and first stored text.
struct PaperText {
    title: String,
    text: String,
}

/// Cluster the papers in `store` into labelled research trends, largest
/// first. Fewer than two papers yield no trends. A failed label call falls
/// back to the cluster's heaviest terms.
pub async fn find_research_trends(
    store: &dyn KnowledgeStore,
    agent: &LlmSynthesisAgent,
    settings: &TrendSettings,
) -> Result<Vec<ResearchTrend>, StoreError> {
    let papers = papers_from_documents(store.list_documents(settings.max_documents).await?);
    if papers.len() < 2 {
        info!(papers = papers.len(), "Too few papers to cluster");
        return Ok(Vec::new());
    }

    let k = if papers.len() < settings.n_clusters {
        (papers.len() / 2).max(2)
    } else {
        settings.n_clusters
    }
    .clamp(1, papers.len());

    let texts: Vec<String> = papers.iter().map(|p| format!("{} {}", p.title, p.text)).collect();
    let Some(tfidf) = TfIdf::fit(&texts) else {
        info!(papers = papers.len(), "No shared vocabulary to cluster on");
        return Ok(Vec::new());
    };
    let labels = kmeans(&tfidf.rows, k);
    debug!(papers = papers.len(), k, terms = tfidf.terms.len(), "Clustered papers");

    let mut trends = Vec::new();
    for cluster in 0..k {
        let members: Vec<usize> = (0..papers.len()).filter(|&i| labels[i] == cluster).collect();
        if members.len() < settings.min_cluster_size.max(1) {
            continue;
        }

        let abstracts: Vec<&str> = members.iter().map(|&i| papers[i].text.as_str()).collect();
        let titles: Vec<&str> = members.iter().map(|&i| papers[i].title.as_str()).collect();
        let label = match agent.cluster_label(&abstracts, &titles).await {
            Ok(label) if !label.is_empty() => label,
            Ok(_) => tfidf.top_terms(&members, FALLBACK_LABEL_TERMS),
            Err(e) => {
                warn!(cluster, error = %e, "Cluster labelling failed, using top terms");
                tfidf.top_terms(&members, FALLBACK_LABEL_TERMS)
            }
        };

        trends.push(ResearchTrend {
            label,
            size: members.len(),
            papers: titles.iter().take(LISTED_TITLES).map(|t| t.to_string()).collect(),
        });
    }

    trends.sort_by(|a, b| b.size.cmp(&a.size));
    info!(trends = trends.len(), "Research trends found");
    Ok(trends)
}

/// One entry per distinct paper id, in store order. A paper document wins
/// over a section of the same paper.
fn papers_from_documents(documents: Vec<StoredDocument>) -> Vec<PaperText> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut papers: Vec<(DocumentKind, PaperText)> = Vec::new();

    for doc in documents {
        let key = if doc.metadata.paper_id.is_empty() {
            doc.id.clone()
        } else {
            doc.metadata.paper_id.clone()
        };
        let entry = PaperText {
            title: doc.metadata.title,
            text: doc.content,
        };
        match index.get(&key) {
            Some(&i) => {
                if papers[i].0 == DocumentKind::Section && doc.metadata.kind == DocumentKind::Paper {
                    papers[i] = (DocumentKind::Paper, entry);
                }
            }
            None => {
                index.insert(key, papers.len());
                papers.push((doc.metadata.kind, entry));
            }
        }
    }

    papers.into_iter().map(|(_, p)| p).collect()
}

/// L2-normalised TF-IDF rows over a fitted vocabulary.
struct TfIdf {
    terms: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TfIdf {
    /// `None` when no term survives the document-frequency bounds.
    fn fit(texts: &[String]) -> Option<Self> {
        let docs: Vec<Vec<String>> = texts.iter().map(|t| terms(t)).collect();
        let n = docs.len();

        let mut df: HashMap<&str, usize> = HashMap::new();
        let mut total: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            let mut seen = HashSet::new();
            for term in doc {
                *total.entry(term).or_default() += 1;
                if seen.insert(term.as_str()) {
                    *df.entry(term).or_default() += 1;
                }
            }
        }

        let max_df = MAX_DF * n as f64;
        let mut vocabulary: Vec<&str> = df
            .iter()
            .filter(|&(_, &count)| count >= MIN_DF && count as f64 <= max_df)
            .map(|(&term, _)| term)
            .collect();
        if vocabulary.is_empty() {
            return None;
        }
        vocabulary.sort_by(|a, b| total[b].cmp(&total[a]).then_with(|| a.cmp(b)));
        vocabulary.truncate(MAX_FEATURES);
        vocabulary.sort_unstable();

        let column: HashMap<&str, usize> = vocabulary.iter().enumerate().map(|(i, &t)| (t, i)).collect();
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| ((1 + n) as f64 / (1 + df[t]) as f64).ln() + 1.0)
            .collect();

        let rows = docs
            .iter()
            .map(|doc| {
                let mut row = vec![0.0; vocabulary.len()];
                for term in doc {
                    if let Some(&j) = column.get(term.as_str()) {
                        row[j] += 1.0;
                    }
                }
                for (value, weight) in row.iter_mut().zip(&idf) {
                    *value *= weight;
                }
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|v| *v /= norm);
                }
                row
            })
            .collect();

        Some(Self {
            terms: vocabulary.into_iter().map(str::to_string).collect(),
            rows,
        })
    }

    /// The heaviest terms across `members`, joined into a label.
    fn top_terms(&self, members: &[usize], count: usize) -> String {
        let mut weights = vec![0.0; self.terms.len()];
        for &i in members {
            for (w, v) in weights.iter_mut().zip(&self.rows[i]) {
                *w += v;
            }
        }
        let mut order: Vec<usize> = (0..self.terms.len()).collect();
        order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then_with(|| a.cmp(&b)));
        order
            .into_iter()
            .take(count)
            .map(|j| self.terms[j].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercased unigrams and bigrams, stop words and numbers removed.
fn terms(text: &str) -> Vec<String> {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2 && !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect();

    let bigrams: Vec<String> = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
    let mut terms = tokens;
    terms.extend(bigrams);
    terms
}

/// Cluster assignment per point: best of [`N_INIT`] seeded k-means++ runs
/// by inertia.
fn kmeans(points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut best: Option<(f64, Vec<usize>)> = None;

    for _ in 0..N_INIT {
        let mut centroids = init_centroids(points, k, &mut rng);
        let mut labels = vec![usize::MAX; points.len()];

        for _ in 0..MAX_ITERATIONS {
            let mut changed = false;
            for (label, point) in labels.iter_mut().zip(points) {
                let (nearest_cluster, _) = nearest(point, &centroids);
                if *label != nearest_cluster {
                    *label = nearest_cluster;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            centroids = update_centroids(points, &labels, &centroids);
        }

        let inertia: f64 = points.iter().zip(&labels).map(|(p, &c)| squared_distance(p, &centroids[c])).sum();
        if best.as_ref().is_none_or(|(lowest, _)| inertia < *lowest) {
            best = Some((inertia, labels));
        }
    }

    best.map(|(_, labels)| labels).unwrap_or_default()
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn init_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.random_range(0..points.len())].clone()];
    while centroids.len() < k {
        let distances: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = distances.iter().sum();
        let next = if total <= f64::EPSILON {
            rng.random_range(0..points.len())
        } else {
            let mut target = rng.random::<f64>() * total;
            distances
                .iter()
                .position(|&d| {
                    target -= d;
                    target <= 0.0
                })
                .unwrap_or(points.len() - 1)
        };
        centroids.push(points[next].clone());
    }
    centroids
}

/// Mean of each cluster's points. An empty cluster keeps its centroid.
fn update_centroids(points: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .map(|c| squared_distance(point, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
