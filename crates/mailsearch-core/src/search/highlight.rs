//! Highlight snippet extraction.
//!
//! Scanning is done by pure functions over `(text, term)`: every call
//! returns the complete match list, with no iterator state carried between
//! calls. Offsets are in characters, not bytes, so windows never split a
//! UTF-8 code point.

use crate::config::HIGHLIGHT_CONTEXT_CHARS;
use std::collections::HashSet;

const ELLIPSIS: &str = "...";

/// Lower-cases one character without changing the character count.
///
/// Characters whose lowercase form expands to several code points keep only
/// the first one, so positions in the folded text line up with the original.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Returns the character offsets of every case-insensitive, non-overlapping
/// occurrence of `term` in `text`.
pub fn find_matches(text: &str, term: &str) -> Vec<usize> {
    let haystack: Vec<char> = text.chars().map(fold).collect();
    let needle: Vec<char> = term.chars().map(fold).collect();

    let mut matches = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return matches;
    }

    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if haystack[pos..pos + needle.len()] == needle[..] {
            matches.push(pos);
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    matches
}

/// Builds a snippet of `context` characters around `[start, start + len)`.
///
/// Ellipses mark each side where the window was cut short of the text.
pub fn snippet(text: &str, start: usize, len: usize, context: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let from = start.saturating_sub(context);
    let to = (start + len + context).min(chars.len());

    let mut out = String::new();
    if from > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&chars[from..to]);
    if to < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Extracts up to `max` snippets, one per distinct term, around each term's
/// first occurrence in `text`. Terms that do not occur contribute nothing.
pub fn extract_highlights(text: &str, terms: &[String], max: usize) -> Vec<String> {
    let mut highlights = Vec::new();
    let mut seen = HashSet::new();
    for term in terms {
        if highlights.len() >= max {
            break;
        }
        if !seen.insert(term.as_str()) {
            continue;
        }
        if let Some(&start) = find_matches(text, term).first() {
            highlights.push(snippet(
                text,
                start,
                term.chars().count(),
                HIGHLIGHT_CONTEXT_CHARS,
            ));
        }
    }
    highlights
}
