//! Content cleaning and overlapping chunk splitting.

/// Preferred split points, strongest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Normalize content before storage.
///
/// Whitespace runs inside a line collapse to one space; lines of 10 characters
/// or fewer (page numbers, stray headers) are dropped.
pub fn clean_content(content: &str) -> String {
    content
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| line.chars().count() > 10)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split `text` into chunks of at most `chunk_size` bytes, each overlapping the
/// previous one by roughly `overlap` bytes.
///
/// Splits prefer paragraph, then line, then sentence, then word boundaries, as
/// long as the boundary keeps the chunk at least half full.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size || chunk_size == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut hard_end = floor_boundary(text, (start + chunk_size).min(text.len()));
        if hard_end <= start {
            hard_end = ceil_boundary(text, start + 1);
        }

        let end = if hard_end == text.len() {
            hard_end
        } else {
            find_break(text, start, hard_end)
        };

        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end >= text.len() {
            break;
        }

        let mut next = floor_boundary(text, end.saturating_sub(overlap));
        if next > start {
            // Start the overlap on a word boundary.
            if let Some(pos) = text[next..end].find(char::is_whitespace) {
                next += pos;
            }
        }
        if next <= start || next >= end {
            next = end;
        }
        start = next;
    }

    chunks
}

fn find_break(text: &str, start: usize, hard_end: usize) -> usize {
    let window = &text[start..hard_end];
    let min = window.len() / 2;
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            if pos >= min {
                return start + pos + sep.len();
            }
        }
    }
    hard_end
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx.min(s.len())
}
