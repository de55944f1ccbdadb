//! Title-based deduplication.

use std::collections::HashSet;

use litscout_core::paper::Paper;

/// Normalized titles this short are noise ("Untitled", "Home", ...).
const MIN_TITLE_CHARS: usize = 11;

/// Lowercase, trim, and drop every character that is neither alphanumeric
/// nor whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Remove duplicate and noise titles, then rank by citations and date.
///
/// The first occurrence of each normalized title survives. The result is
/// sorted (stably) by [`Paper::rank_key`], highest first.
pub fn dedupe(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Paper> = papers
        .into_iter()
        .filter(|p| {
            let key = normalize_title(&p.title);
            key.chars().count() >= MIN_TITLE_CHARS && seen.insert(key)
        })
        .collect();

    unique.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));
    unique
}
