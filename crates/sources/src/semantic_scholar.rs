//! Semantic Scholar source (Graph API). Off unless enabled in config.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use litscout_core::error::SourceError;
use litscout_core::paper::Paper;
use litscout_core::source::SourceAdapter;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::http::{build_client, get_text, normalize_whitespace, parse_json};

const S2_SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const NAME: &str = "semantic_scholar";
const FIELDS: &str = "title,authors,abstract,url,venue,year,citationCount,externalIds";
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    citation_count: Option<u32>,
    #[serde(default)]
    external_ids: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    #[serde(default)]
    name: Option<String>,
}

pub struct SemanticScholarSource {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    timeout_secs: u64,
    enabled: bool,
}

impl SemanticScholarSource {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(NAME, timeout_secs)?,
            api_key,
            base_url: S2_SEARCH_URL.into(),
            timeout_secs,
            enabled: false,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarSource {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<Paper>, SourceError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let limit = count.min(MAX_LIMIT).to_string();
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("query", query), ("limit", limit.as_str()), ("fields", FIELDS)]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        debug!(query = %query, limit = %limit, "Semantic Scholar search");

        let body = get_text(NAME, self.timeout_secs, request).await?;
        parse_search_response(&body)
    }
}

/// Parse a Graph API search response into papers.
pub fn parse_search_response(body: &str) -> Result<Vec<Paper>, SourceError> {
    let response: SearchResponse = parse_json(NAME, body)?;
    Ok(response.data.into_iter().filter_map(to_paper).collect())
}

fn to_paper(item: S2Paper) -> Option<Paper> {
    let title = normalize_whitespace(item.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    let ids = item.external_ids.unwrap_or_default();
    let id = |key: &str| -> Option<String> {
        ids.get(key).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let pdf_url = id("ArXiv").map(|arxiv| format!("https://arxiv.org/pdf/{arxiv}.pdf"));
    let url = pdf_url
        .clone()
        .or(item.url)
        .unwrap_or_default();

    Some(Paper {
        title,
        authors: item
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|n| !n.is_empty())
            .collect(),
        abstract_text: item.abstract_text.unwrap_or_default(),
        url,
        pdf_url,
        publication_date: item
            .year
            .and_then(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).single()),
        venue: item.venue.filter(|v| !v.is_empty()),
        citations: item.citation_count.unwrap_or(0),
        doi: id("DOI"),
        source: NAME.into(),
        ..Paper::default()
    })
}
