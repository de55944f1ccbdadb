//! HTML → readable text, sections, and references.

use litscout_core::extract::Section;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements that never carry article content.
const SKIPPED: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg", "button",
    "form",
];

/// Elements after which inline text is flushed into its own block.
const BLOCKS: &[&str] = &[
    "p", "div", "li", "br", "tr", "td", "th", "pre", "blockquote", "figcaption", "section",
    "article", "h4", "h5", "h6", "dt", "dd", "table", "ul", "ol",
];

const MAX_REFERENCES: usize = 50;
const MIN_REFERENCE_CHARS: usize = 20;

/// The readable parts of one HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHtml {
    pub title: String,
    pub text: String,
    pub sections: Vec<Section>,
    pub references: Vec<String>,
}

#[derive(Debug)]
enum Block {
    Heading(String),
    Text(String),
}

/// Parse an HTML document.
///
/// Content comes from `<main>` or `<article>` when present, else `<body>`.
/// `h1`–`h3` headings start new sections; a section titled "References" or
/// "Bibliography" supplies the reference list instead of a section.
pub fn parse_html(html: &str) -> ParsedHtml {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|el| collapse(&el.text().collect::<String>()))
        .unwrap_or_default();

    let root = ["main", "article", "body"]
        .iter()
        .find_map(|sel| select_first(&document, sel));

    let mut blocks = Vec::new();
    if let Some(root) = root {
        let mut inline = String::new();
        walk(root, &mut blocks, &mut inline);
        flush(&mut blocks, &mut inline);
    }

    let mut text_lines = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut references = Vec::new();
    let mut in_references = false;

    for block in blocks {
        match block {
            Block::Heading(heading) => {
                text_lines.push(heading.clone());
                in_references = is_reference_heading(&heading);
                if !in_references {
                    sections.push(Section {
                        title: heading,
                        content: String::new(),
                    });
                }
            }
            Block::Text(line) => {
                if in_references {
                    if line.chars().count() > MIN_REFERENCE_CHARS && references.len() < MAX_REFERENCES {
                        references.push(line.clone());
                    }
                } else if let Some(section) = sections.last_mut() {
                    if !section.content.is_empty() {
                        section.content.push('\n');
                    }
                    section.content.push_str(&line);
                }
                text_lines.push(line);
            }
        }
    }

    sections.retain(|s| !s.content.trim().is_empty());

    ParsedHtml {
        title,
        text: text_lines.join("\n"),
        sections,
        references,
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn walk(element: ElementRef, blocks: &mut Vec<Block>, inline: &mut String) {
    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            let tag = child.value().name();
            if SKIPPED.contains(&tag) {
                continue;
            }
            if matches!(tag, "h1" | "h2" | "h3") {
                flush(blocks, inline);
                let heading = collapse(&child.text().collect::<String>());
                if !heading.is_empty() {
                    blocks.push(Block::Heading(heading));
                }
                continue;
            }
            let is_block = BLOCKS.contains(&tag);
            if is_block {
                flush(blocks, inline);
            }
            walk(child, blocks, inline);
            if is_block {
                flush(blocks, inline);
            }
        } else if let Node::Text(text) = node.value() {
            inline.push_str(text);
            inline.push(' ');
        }
    }
}

fn flush(blocks: &mut Vec<Block>, inline: &mut String) {
    let line = collapse(inline);
    if !line.is_empty() {
        blocks.push(Block::Text(line));
    }
    inline.clear();
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_reference_heading(heading: &str) -> bool {
    // Strip numbering like "7 References" or "VII. Bibliography".
    let words: String = heading
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let last = words.split_whitespace().last().unwrap_or_default();
    matches!(last, "references" | "bibliography")
}

/// Split a plain-text document into sections on numbered or well-known
/// headings ("1 Introduction", "Abstract", "Conclusion", ...).
pub fn sections_from_plain_text(text: &str) -> Vec<Section> {
    const KNOWN: &[&str] = &[
        "abstract", "introduction", "background", "related work", "method", "methods",
        "methodology", "experiments", "results", "discussion", "conclusion", "conclusions",
    ];

    let mut sections: Vec<Section> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let stripped = line
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ')
            .to_lowercase();
        let numbered = line.starts_with(|c: char| c.is_ascii_digit())
            && line.len() < 80
            && line.chars().find(|c| c.is_alphabetic()).is_some_and(char::is_uppercase);
        if numbered || KNOWN.contains(&stripped.as_str()) {
            sections.push(Section {
                title: line.to_string(),
                content: String::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            if !section.content.is_empty() {
                section.content.push('\n');
            }
            section.content.push_str(line);
        }
    }
    sections.retain(|s| !s.content.is_empty());
    sections
}
