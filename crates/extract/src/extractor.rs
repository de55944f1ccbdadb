//! The default HTTP extractor.
//!
//! Fetches a paper URL and turns HTML or plain text into [`ExtractedContent`].
//! arXiv PDF links are rewritten to arXiv's HTML rendering first; other PDFs
//! and binary formats are reported as unsupported. Local `.html`, `.txt` and
//! `.md` files go through the same parsing.

use async_trait::async_trait;
use litscout_core::error::ExtractionError;
use litscout_core::extract::{ExtractedContent, Extractor};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::html::{parse_html, sections_from_plain_text};

/// Pages shorter than this after cleaning are treated as having no content.
const MIN_TEXT_CHARS: usize = 200;

pub struct HtmlExtractor {
    client: reqwest::Client,
}

impl HtmlExtractor {
    pub fn new(timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("litscout/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ExtractionError::Fetch {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    fn name(&self) -> &str {
        "html"
    }

    async fn extract_from_url(&self, url: &str) -> Result<ExtractedContent, ExtractionError> {
        let fetch_url = resolve_fetch_url(url)?;
        debug!(url = %url, fetch_url = %fetch_url, "Extracting content");

        let fetch_err = |reason: String| ExtractionError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(fetch_url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fetch_err("request timed out".into())
                } else {
                    fetch_err(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !is_textual(&content_type) {
            return Err(ExtractionError::Unsupported {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
        build_content(url, fetch_url.as_str(), &content_type, &body)
    }

    async fn extract_from_file(&self, path: &Path) -> Result<ExtractedContent, ExtractionError> {
        let display = path.display().to_string();
        let content_type = file_content_type(path).map_err(|content_type| ExtractionError::Unsupported {
            url: display.clone(),
            content_type,
        })?;

        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractionError::Fetch {
                url: display.clone(),
                reason: e.to_string(),
            })?;

        let file_url = std::path::absolute(path)
            .ok()
            .and_then(|abs| Url::from_file_path(abs).ok())
            .map_or_else(|| display.clone(), String::from);
        debug!(path = %path.display(), content_type, "Extracting local file");

        let mut content = build_content(&display, &file_url, content_type, &body)?;
        content.metadata.insert("file_path".into(), display.into());
        Ok(content)
    }
}

/// Content type for a local file by extension; the `Err` names what was
/// found instead.
fn file_content_type(path: &Path) -> Result<&'static str, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" | "xhtml" => Ok("text/html"),
        "txt" => Ok("text/plain"),
        "md" | "markdown" => Ok("text/markdown"),
        "pdf" => Err("application/pdf".into()),
        "" => Err("file without extension".into()),
        other => Err(format!("file extension '.{other}'")),
    }
}

/// Where to fetch `url` from: arXiv `/pdf/<id>` links map to `/html/<id>`.
pub fn resolve_fetch_url(url: &str) -> Result<Url, ExtractionError> {
    let mut parsed = Url::parse(url).map_err(|e| ExtractionError::Fetch {
        url: url.to_string(),
        reason: format!("invalid URL: {e}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractionError::Fetch {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let is_arxiv = parsed
        .host_str()
        .is_some_and(|h| h == "arxiv.org" || h.ends_with(".arxiv.org"));
    if is_arxiv {
        if let Some(id) = parsed.path().strip_prefix("/pdf/") {
            let id = id.trim_end_matches(".pdf").to_string();
            parsed.set_path(&format!("/html/{id}"));
            // Some mirrors (export., www.) do not serve the HTML rendering.
            let _ = parsed.set_host(Some("arxiv.org"));
            let _ = parsed.set_scheme("https");
        }
    }
    Ok(parsed)
}

fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
        || content_type.contains("text/plain")
        || content_type.contains("text/markdown")
}

/// Turn a fetched body into extracted content.
pub fn build_content(
    url: &str,
    fetch_url: &str,
    content_type: &str,
    body: &str,
) -> Result<ExtractedContent, ExtractionError> {
    let is_plain = content_type.contains("text/plain") || content_type.contains("text/markdown");

    let (method, title, text, sections, references) = if is_plain {
        let text = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let sections = sections_from_plain_text(&text);
        ("text", String::new(), text, sections, Vec::new())
    } else {
        let parsed = parse_html(body);
        ("html", parsed.title, parsed.text, parsed.sections, parsed.references)
    };

    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(ExtractionError::Empty(url.to_string()));
    }

    let mut metadata = serde_json::Map::new();
    metadata.insert("extraction_method".into(), method.into());
    metadata.insert("content_type".into(), content_type.into());
    metadata.insert("source_url".into(), fetch_url.into());
    if !title.is_empty() {
        metadata.insert("title".into(), title.into());
    }
    metadata.insert("word_count".into(), text.split_whitespace().count().into());
    metadata.insert("section_count".into(), sections.len().into());
    metadata.insert("reference_count".into(), references.len().into());

    Ok(ExtractedContent {
        text,
        metadata,
        sections,
        references,
        ..ExtractedContent::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arxiv_pdf_links_map_to_html() {
        let url = resolve_fetch_url("http://export.arxiv.org/pdf/1706.03762v7.pdf").unwrap();
        assert_eq!(url.as_str(), "https://arxiv.org/html/1706.03762v7");

        let url = resolve_fetch_url("https://arxiv.org/pdf/2101.00001").unwrap();
        assert_eq!(url.as_str(), "https://arxiv.org/html/2101.00001");
    }

    #[test]
    fn other_urls_pass_through() {
        let url = resolve_fetch_url("https://openreview.net/forum?id=abc").unwrap();
        assert_eq!(url.as_str(), "https://openreview.net/forum?id=abc");
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(resolve_fetch_url("not a url").is_err());
        assert!(resolve_fetch_url("ftp://example.org/paper.pdf").is_err());
    }

    #[test]
    fn textual_content_types() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("text/plain"));
        assert!(is_textual(""));
        assert!(!is_textual("application/pdf"));
        assert!(!is_textual("image/png"));
    }

    #[test]
    fn builds_html_content_with_metadata() {
        let paragraph = "Diffusion models denoise iteratively and have become a standard generative tool. ".repeat(4);
        let html = format!(
            "<html><head><title>Diffusion</title></head><body><h2>1 Introduction</h2><p>{paragraph}</p></body></html>"
        );
        let content = build_content("https://a", "https://a", "text/html", &html).unwrap();

        assert_eq!(content.extraction_method(), Some("html"));
        assert_eq!(content.metadata["title"], "Diffusion");
        assert_eq!(content.sections.len(), 1);
        assert_eq!(content.metadata["section_count"], 1);
        assert!(content.text.starts_with("1 Introduction"));
    }

    #[test]
    fn short_pages_are_empty() {
        let err = build_content("https://a", "https://a", "text/html", "<p>Access denied</p>").unwrap_err();
        assert!(matches!(err, ExtractionError::Empty(_)));
    }

    #[tokio::test]
    async fn extracts_local_html_and_markdown() {
        let dir = tempfile::TempDir::new().unwrap();
        let paragraph = "Sparse mixture-of-experts layers route each token to a few experts. ".repeat(4);
        let html_path = dir.path().join("moe.html");
        std::fs::write(
            &html_path,
            format!("<html><head><title>Routing</title></head><body><h2>2 Method</h2><p>{paragraph}</p></body></html>"),
        )
        .unwrap();
        let md_path = dir.path().join("notes.MD");
        std::fs::write(&md_path, format!("Introduction\n\n{paragraph}\n")).unwrap();

        let extractor = HtmlExtractor::new(5).unwrap();

        let html = extractor.extract_from_file(&html_path).await.unwrap();
        assert_eq!(html.extraction_method(), Some("html"));
        assert_eq!(html.metadata["title"], "Routing");
        assert!(html.metadata["source_url"].as_str().unwrap().starts_with("file://"));
        assert_eq!(html.metadata["file_path"], html_path.display().to_string());

        let md = extractor.extract_from_file(&md_path).await.unwrap();
        assert_eq!(md.extraction_method(), Some("text"));
        assert_eq!(md.sections[0].title, "Introduction");
    }

    #[tokio::test]
    async fn local_pdf_and_missing_files_fail() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        let extractor = HtmlExtractor::new(5).unwrap();

        let err = extractor.extract_from_file(&pdf).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported { ref content_type, .. } if content_type == "application/pdf"));

        let err = extractor.extract_from_file(&dir.path().join("gone.txt")).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Fetch { .. }));
    }

    #[test]
    fn plain_text_is_kept_line_by_line() {
        let body = format!("Abstract\n\n{}\n", "We analyse optimisers for large batch training. ".repeat(6));
        let content = build_content("https://a", "https://a", "text/plain", &body).unwrap();
        assert_eq!(content.extraction_method(), Some("text"));
        assert_eq!(content.sections.len(), 1);
        assert_eq!(content.sections[0].title, "Abstract");
    }
}
