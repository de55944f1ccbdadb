//! arXiv source: the primary indexed-archive adapter.
//!
//! Queries the arXiv Atom API, newest submissions first, and maps each
//! `<entry>` to a [`Paper`] whose canonical URL is the PDF link.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use litscout_core::error::SourceError;
use litscout_core::paper::Paper;
use litscout_core::source::SourceAdapter;
use tracing::debug;

use crate::http::{build_client, get_text, normalize_whitespace};

const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
const NAME: &str = "arxiv";

pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    enabled: bool,
}

impl ArxivSource {
    pub fn new(timeout_secs: u64) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(NAME, timeout_secs)?,
            base_url: ARXIV_API_BASE.into(),
            timeout_secs,
            enabled: true,
        })
    }

    /// Point the adapter at a different API endpoint.
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
impl SourceAdapter for ArxivSource {
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
        let url = build_search_url(&self.base_url, query, count);
        debug!(url = %url, "arXiv search");

        let body = get_text(NAME, self.timeout_secs, self.client.get(&url)).await?;
        let mut papers = parse_atom_feed(&body)?;
        papers.truncate(count);
        Ok(papers)
    }
}

/// Build the arXiv API search URL.
pub fn build_search_url(base_url: &str, query: &str, max_results: usize) -> String {
    let search_query = format!("all:{}", query.trim());
    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
        base_url,
        urlencoding::encode(&search_query),
        max_results,
    )
}

/// Parse an Atom feed into papers, skipping entries without an id or title.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>, SourceError> {
    if !xml.contains("<feed") {
        return Err(SourceError::Parse {
            source_name: NAME.into(),
            reason: "response is not an Atom feed".into(),
        });
    }
    Ok(extract_blocks(xml, "entry").iter().filter_map(|e| parse_entry(e)).collect())
}

fn parse_entry(entry: &str) -> Option<Paper> {
    let id_url = extract_tag_text(entry, "id")?;
    let title = normalize_whitespace(&unescape(&extract_tag_text(entry, "title")?));
    if title.is_empty() {
        return None;
    }

    let authors = extract_blocks(entry, "author")
        .iter()
        .filter_map(|block| extract_tag_text(block, "name"))
        .map(|name| normalize_whitespace(&unescape(&name)))
        .collect();

    let summary = normalize_whitespace(&unescape(&extract_tag_text(entry, "summary").unwrap_or_default()));

    let publication_date = extract_tag_text(entry, "published")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));

    let mut pdf_url = None;
    let mut search_from = 0;
    while let Some(pos) = entry[search_from..].find("<link") {
        let start = search_from + pos;
        let Some(end) = entry[start..].find('>').map(|e| start + e + 1) else {
            break;
        };
        let tag = &entry[start..end];
        let title_attr = extract_attribute(tag, "title").unwrap_or_default();
        let link_type = extract_attribute(tag, "type").unwrap_or_default();
        if title_attr == "pdf" || link_type == "application/pdf" {
            pdf_url = extract_attribute(tag, "href");
        }
        search_from = end;
    }
    let pdf_url = pdf_url.unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", arxiv_id_from_url(&id_url)));

    let doi = extract_tag_text(entry, "arxiv:doi").filter(|d| !d.is_empty());

    Some(Paper {
        title,
        authors,
        abstract_text: summary,
        url: pdf_url.clone(),
        pdf_url: Some(pdf_url),
        publication_date,
        venue: Some("arXiv".into()),
        citations: 0,
        doi,
        source: NAME.into(),
        ..Paper::default()
    })
}

/// All `<tag>...</tag>` blocks, in document order.
fn extract_blocks(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = xml[search_from..].find(&open) {
        let start = search_from + pos;
        let Some(end) = xml[start..].find(&close).map(|e| start + e + close.len()) else {
            break;
        };
        blocks.push(xml[start..end].to_string());
        search_from = end;
    }
    blocks
}

/// Text content of the first `<tag ...>text</tag>`.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut search_from = 0;
    let start_pos = loop {
        let pos = search_from + xml[search_from..].find(&open)?;
        // Reject prefixes of longer tag names (<id> vs <idx>).
        match xml[pos + open.len()..].chars().next() {
            Some('>') | Some(' ') | Some('\n') | Some('\t') => break pos,
            _ => search_from = pos + open.len(),
        }
    };
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    Some(xml[content_start..content_end].trim().to_string())
}

fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!("{attr}=\"");
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(unescape(&tag[start..end]))
}

/// The arXiv id from a URL like `http://arxiv.org/abs/1706.03762v7`.
pub fn arxiv_id_from_url(url: &str) -> String {
    if let Some(pos) = url.rfind("/abs/") {
        url[pos + 5..].to_string()
    } else if let Some(pos) = url.rfind("/pdf/") {
        url[pos + 5..].trim_end_matches(".pdf").to_string()
    } else {
        url.to_string()
    }
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models are based on
      complex recurrent networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.48550/arXiv.1706.03762</arxiv:doi>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <published>2018-10-11T00:00:00Z</published>
    <title>BERT &amp; Friends: Pre-training of Deep Bidirectional Transformers</title>
    <summary>We introduce a new language representation model.</summary>
    <author><name>Jacob Devlin</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_into_papers() {
        let papers = parse_atom_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Attention Is All You Need");
        assert_eq!(first.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(first.url, "http://arxiv.org/pdf/1706.03762v7");
        assert_eq!(first.pdf_url.as_deref(), Some("http://arxiv.org/pdf/1706.03762v7"));
        assert_eq!(first.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
        assert_eq!(first.venue.as_deref(), Some("arXiv"));
        assert_eq!(first.source, "arxiv");
        assert!(first.abstract_text.starts_with("The dominant sequence"));
        assert_eq!(
            first.publication_date.unwrap().format("%Y-%m-%d").to_string(),
            "2017-06-12"
        );
    }

    #[test]
    fn missing_pdf_link_is_derived_from_id() {
        let papers = parse_atom_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers[1].url, "https://arxiv.org/pdf/1810.04805v2");
        assert_eq!(papers[1].title, "BERT & Friends: Pre-training of Deep Bidirectional Transformers");
        assert!(papers[1].doi.is_none());
    }

    #[test]
    fn empty_feed_has_no_papers() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_atom_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn non_feed_body_is_a_parse_error() {
        let err = parse_atom_feed("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn search_url_sorts_by_submission_date() {
        let url = build_search_url(ARXIV_API_BASE, "graph neural networks", 15);
        assert!(url.starts_with("https://export.arxiv.org/api/query?search_query=all%3Agraph%20neural%20networks"));
        assert!(url.contains("max_results=15"));
        assert!(url.contains("sortBy=submittedDate&sortOrder=descending"));
    }

    #[test]
    fn arxiv_id_from_urls() {
        assert_eq!(arxiv_id_from_url("http://arxiv.org/abs/1706.03762v7"), "1706.03762v7");
        assert_eq!(arxiv_id_from_url("https://arxiv.org/pdf/2101.00001.pdf"), "2101.00001");
    }
}
