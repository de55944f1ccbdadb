//! Web search source: the secondary, scrape-style adapter.
//!
//! Uses the Google Custom Search JSON API. Scholarly pages usually carry
//! Highwire `citation_*` meta tags, which Google surfaces under
//! `pagemap.metatags`; when present they supply authors, date, venue, DOI and
//! PDF link. Results are read one at a time with `request_delay` between
//! reads, independent of the coordinator's round backoff.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use litscout_core::error::SourceError;
use litscout_core::paper::Paper;
use litscout_core::source::SourceAdapter;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::http::{build_client, get_text, normalize_whitespace, parse_json};

const GOOGLE_CSE_BASE: &str = "https://www.googleapis.com/customsearch/v1";
const NAME: &str = "web";
/// The API returns at most 10 items per request and 100 per query.
const PAGE_SIZE: usize = 10;
const MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default, rename = "displayLink")]
    display_link: Option<String>,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<HashMap<String, serde_json::Value>>,
}

pub struct WebSearchSource {
    client: reqwest::Client,
    api_key: Option<String>,
    cse_id: Option<String>,
    base_url: String,
    timeout_secs: u64,
    request_delay: Duration,
    enabled: bool,
}

impl WebSearchSource {
    pub fn new(
        api_key: Option<String>,
        cse_id: Option<String>,
        timeout_secs: u64,
        request_delay: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(NAME, timeout_secs)?,
            api_key,
            cse_id,
            base_url: GOOGLE_CSE_BASE.into(),
            timeout_secs,
            request_delay,
            enabled: true,
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

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.api_key.as_deref()?, self.cse_id.as_deref()?))
    }
}

#[async_trait]
impl SourceAdapter for WebSearchSource {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.credentials().is_some()
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<Paper>, SourceError> {
        let (api_key, cse_id) = self.credentials().ok_or_else(|| {
            SourceError::NotConfigured("web search needs GOOGLE_API_KEY and GOOGLE_CSE_ID".into())
        })?;

        let count = count.min(MAX_RESULTS);
        let mut papers = Vec::with_capacity(count);
        let mut start = 1;

        while papers.len() < count && start <= MAX_RESULTS {
            let num = (count - papers.len()).min(PAGE_SIZE);
            let (num_param, start_param) = (num.to_string(), start.to_string());
            let request = self.client.get(&self.base_url).query(&[
                ("key", api_key),
                ("cx", cse_id),
                ("q", query),
                ("num", num_param.as_str()),
                ("start", start_param.as_str()),
            ]);
            debug!(query = %query, start, num, "Web search page");

            let body = get_text(NAME, self.timeout_secs, request).await?;
            let page = parse_search_response(&body)?;
            if page.is_empty() {
                break;
            }

            for paper in page {
                papers.push(paper);
                if papers.len() >= count {
                    break;
                }
                tokio::time::sleep(self.request_delay).await;
            }
            start += PAGE_SIZE;
        }

        Ok(papers)
    }
}

/// Parse a Custom Search response body into papers.
pub fn parse_search_response(body: &str) -> Result<Vec<Paper>, SourceError> {
    let response: SearchResponse = parse_json(NAME, body)?;
    Ok(response.items.into_iter().filter_map(item_to_paper).collect())
}

fn item_to_paper(item: SearchItem) -> Option<Paper> {
    let empty = HashMap::new();
    let tags = item
        .pagemap
        .as_ref()
        .and_then(|p| p.metatags.first())
        .unwrap_or(&empty);
    let tag = |key: &str| -> Option<String> {
        tags.get(key)
            .and_then(|v| v.as_str())
            .map(normalize_whitespace)
            .filter(|s| !s.is_empty())
    };

    let title = tag("citation_title").unwrap_or_else(|| normalize_whitespace(&item.title));
    if title.is_empty() || item.link.is_empty() {
        return None;
    }

    let authors = tag("citation_author")
        .or_else(|| tag("citation_authors"))
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let publication_date = tag("citation_publication_date")
        .or_else(|| tag("citation_date"))
        .or_else(|| tag("citation_online_date"))
        .and_then(|d| parse_loose_date(&d));

    let venue = tag("citation_journal_title")
        .or_else(|| tag("citation_conference_title"))
        .or(item.display_link);

    let abstract_text = tag("citation_abstract")
        .or_else(|| tag("og:description"))
        .unwrap_or_else(|| normalize_whitespace(&item.snippet));

    Some(Paper {
        title,
        authors,
        abstract_text,
        url: item.link,
        pdf_url: tag("citation_pdf_url"),
        publication_date,
        venue,
        citations: 0,
        doi: tag("citation_doi"),
        source: NAME.into(),
        ..Paper::default()
    })
}

/// Parse `YYYY/MM/DD`, `YYYY-MM-DD`, `YYYY/MM` or a bare `YYYY`.
pub fn parse_loose_date(raw: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<u32> = raw
        .trim()
        .split(['/', '-'])
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;

    let (year, month, day) = match parts.as_slice() {
        [y] => (*y, 1, 1),
        [y, m] => (*y, *m, 1),
        [y, m, d, ..] => (*y, *m, *d),
        [] => return None,
    };
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
