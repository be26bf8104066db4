//! Query mini-language parsing and text tokenization.
//!
//! A query string is split on whitespace (double-quoted spans stay together)
//! and each token is either a structured field filter or free text:
//!
//! | Token | Effect |
//! |-------|--------|
//! | `from:x`, `to:x`, `subject:x` | case-insensitive substring filter |
//! | `has:attachment` | attachment presence |
//! | `is:read`, `is:unread`, `is:starred` | flag filters |
//! | `after:YYYY-MM-DD`, `before:YYYY-MM-DD` | date range (unparseable dates are dropped) |
//! | anything else | free-text terms |
//!
//! Quoted phrases are not matched as phrases: their words are scored as
//! independent terms like any other free text.

use crate::search::types::{EmailDocument, SearchOptions};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Characters other than word characters, whitespace, `@`, `.`, and `-`.
static NON_TERM_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s@.\-]").expect("static pattern is valid"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "do",
        "for", "from", "had", "has", "have", "he", "her", "his", "i", "if", "in", "into", "is",
        "it", "its", "me", "my", "no", "not", "of", "on", "or", "our", "she", "so", "that",
        "the", "their", "them", "then", "there", "these", "they", "this", "to", "was", "we",
        "were", "what", "when", "which", "who", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `term` is in the fixed stop-word set.
pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(term)
}

/// Normalizes text into index terms.
///
/// Lower-cases, replaces every character except word characters, `@`, `.`,
/// and `-` with whitespace, splits on whitespace, and drops single-character
/// tokens and stop words. Email addresses survive as single terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = NON_TERM_CHARS.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 1 && !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

/// Structured filters extracted from a query and/or supplied by the caller.
///
/// All present filters must match (AND). Substring filters compare
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    /// Sender contains
    pub from: Option<String>,
    /// Any recipient contains
    pub to: Option<String>,
    /// Subject contains
    pub subject: Option<String>,
    /// Attachment presence required
    pub has_attachment: Option<bool>,
    /// Read flag must equal
    pub is_read: Option<bool>,
    /// Starred flag must equal
    pub is_starred: Option<bool>,
    /// Date on or after the start of this day (UTC)
    pub after: Option<NaiveDate>,
    /// Date strictly before the start of this day (UTC)
    pub before: Option<NaiveDate>,
    /// Folder equals
    pub folder: Option<String>,
    /// Labels contain
    pub label: Option<String>,
}

impl QueryFilters {
    /// Returns true if no filter is set.
    pub fn is_empty(&self) -> bool {
        self == &QueryFilters::default()
    }

    /// Combines query filters with caller-supplied options.
    ///
    /// Options fill folder/label and tighten sender and date bounds; when
    /// both sides set the same date bound the stricter one wins. A `from`
    /// filter present on both sides keeps the query's value and the option
    /// is checked separately by [`SearchFilters`].
    pub fn merged_with(&self, options: &SearchOptions) -> SearchFilters {
        let mut query = self.clone();
        query.folder = query.folder.or_else(|| options.folder.clone());
        query.label = query.label.or_else(|| options.label.clone());
        query.after = match (query.after, options.after) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        query.before = match (query.before, options.before) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let extra_from = match (&query.from, &options.from) {
            (None, Some(from)) => {
                query.from = Some(from.clone());
                None
            }
            (Some(_), Some(from)) => Some(from.clone()),
            _ => None,
        };
        SearchFilters { query, extra_from }
    }

    /// Evaluates every set filter against a document.
    pub fn matches(&self, doc: &EmailDocument) -> bool {
        if let Some(from) = &self.from {
            if !contains_ignore_case(&doc.from, from) {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if !doc.to.iter().any(|r| contains_ignore_case(r, to)) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if !contains_ignore_case(&doc.subject, subject) {
                return false;
            }
        }
        if let Some(has) = self.has_attachment {
            if doc.has_attachments != has {
                return false;
            }
        }
        if let Some(read) = self.is_read {
            if doc.is_read != read {
                return false;
            }
        }
        if let Some(starred) = self.is_starred {
            if doc.is_starred != starred {
                return false;
            }
        }
        if let Some(after) = self.after {
            if doc.date < start_of_day(after) {
                return false;
            }
        }
        if let Some(before) = self.before {
            if doc.date >= start_of_day(before) {
                return false;
            }
        }
        if let Some(folder) = &self.folder {
            if &doc.folder != folder {
                return false;
            }
        }
        if let Some(label) = &self.label {
            if !doc.labels.iter().any(|l| l == label) {
                return false;
            }
        }
        true
    }
}

/// Query filters merged with caller options, ready for evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    /// Merged field filters
    pub query: QueryFilters,
    /// Second sender filter when both the query and the options set one
    pub extra_from: Option<String>,
}

impl SearchFilters {
    /// Returns true if no filter is set.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.extra_from.is_none()
    }

    /// Evaluates all filters against a document.
    pub fn matches(&self, doc: &EmailDocument) -> bool {
        if let Some(from) = &self.extra_from {
            if !contains_ignore_case(&doc.from, from) {
                return false;
            }
        }
        self.query.matches(doc)
    }
}

/// A parsed query: free-text terms plus structured filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    /// Normalized free-text terms, in query order (may repeat)
    pub terms: Vec<String>,
    /// Free-text portion of the query with field tokens removed
    pub text: String,
    /// Field filters found in the query
    pub filters: QueryFilters,
}

impl ParsedQuery {
    /// Returns true if the query carries no free-text terms.
    pub fn is_filter_only(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Parses a query string into terms and filters.
pub fn parse_query(query: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut free_text: Vec<String> = Vec::new();

    for token in split_respecting_quotes(query) {
        if apply_field_token(&token, &mut parsed.filters) {
            continue;
        }
        free_text.push(token);
    }

    parsed.text = free_text.join(" ");
    parsed.terms = tokenize(&parsed.text);
    parsed
}

/// Splits on whitespace, keeping double-quoted spans together.
///
/// Quotes are stripped; an unterminated quote runs to the end of input.
fn split_respecting_quotes(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in query.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Applies a `field:value` token. Returns false if the token is free text.
fn apply_field_token(token: &str, filters: &mut QueryFilters) -> bool {
    let Some((field, value)) = token.split_once(':') else {
        return false;
    };
    let field = field.to_lowercase();
    let value_lower = value.to_lowercase();

    match (field.as_str(), value_lower.as_str()) {
        ("from", v) if !v.is_empty() => filters.from = Some(value.to_string()),
        ("to", v) if !v.is_empty() => filters.to = Some(value.to_string()),
        ("subject", v) if !v.is_empty() => filters.subject = Some(value.to_string()),
        ("has", "attachment") => filters.has_attachment = Some(true),
        ("is", "read") => filters.is_read = Some(true),
        ("is", "unread") => filters.is_read = Some(false),
        ("is", "starred") => filters.is_starred = Some(true),
        // Invalid dates are dropped, but the token is still consumed.
        ("after", _) => {
            if let Some(date) = parse_date(value) {
                filters.after = Some(date);
            }
        }
        ("before", _) => {
            if let Some(date) = parse_date(value) {
                filters.before = Some(date);
            }
        }
        _ => return false,
    }
    true
}

/// Parses `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .ok()
}

/// Midnight UTC at the start of `date`.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
