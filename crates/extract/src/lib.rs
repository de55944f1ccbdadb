//! Content extraction for litscout.
//!
//! [`HtmlExtractor`] is the default [`Extractor`](litscout_core::Extractor):
//! HTTP fetch or local file read, plus HTML/plain-text parsing. PDF and OCR
//! extraction are not supported and surface as `ExtractionError::Unsupported`.

pub mod extractor;
pub mod html;

pub use extractor::HtmlExtractor;
pub use html::{ParsedHtml, parse_html};
