use crate::config::{DEFAULT_ALPHA, DEFAULT_LIMIT};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, caller-assigned document identifier.
///
/// Email ids come from the mail provider (message id or provider key), so
/// unlike generated numeric ids they are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An email as seen by the search engine.
///
/// Indexed documents are immutable; indexing a document with an existing id
/// replaces the previous version in both indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDocument {
    /// Unique identifier
    pub id: DocumentId,
    /// Conversation the email belongs to, if known
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Sender address
    pub from: String,
    /// Recipient addresses
    #[serde(default)]
    pub to: Vec<String>,
    /// Sent/received timestamp
    pub date: DateTime<Utc>,
    /// Mailbox folder (e.g. "inbox")
    #[serde(default)]
    pub folder: String,
    /// Provider labels
    #[serde(default)]
    pub labels: Vec<String>,
    /// Read flag
    #[serde(default)]
    pub is_read: bool,
    /// Starred flag
    #[serde(default)]
    pub is_starred: bool,
    /// Whether the email has at least one attachment
    #[serde(default)]
    pub has_attachments: bool,
}

impl EmailDocument {
    /// Creates a document with the given id, subject, and body.
    ///
    /// Remaining fields are empty, unread, and dated now; set them directly.
    pub fn new(id: impl Into<DocumentId>, subject: &str, body: &str) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            subject: subject.to_string(),
            body: body.to_string(),
            from: String::new(),
            to: Vec::new(),
            date: Utc::now(),
            folder: String::new(),
            labels: Vec::new(),
            is_read: false,
            is_starred: false,
            has_attachments: false,
        }
    }

    /// Text fed to the lexical index: subject, body, sender, recipients.
    pub fn lexical_text(&self) -> String {
        let mut text = String::with_capacity(
            self.subject.len() + self.body.len() + self.from.len() + 16 * self.to.len(),
        );
        text.push_str(&self.subject);
        text.push(' ');
        text.push_str(&self.body);
        text.push(' ');
        text.push_str(&self.from);
        for recipient in &self.to {
            text.push(' ');
            text.push_str(recipient);
        }
        text
    }

    /// Flattened text that gets chunked and embedded.
    pub fn embedding_text(&self) -> String {
        format!(
            "Subject: {}\nFrom: {}\nTo: {}\n\n{}",
            self.subject,
            self.from,
            self.to.join(", "),
            self.body
        )
    }
}

/// Which ranker produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// BM25 over the inverted index
    Lexical,
    /// Embedding similarity
    Semantic,
    /// Reciprocal rank fusion of both
    Hybrid,
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matching document (possibly reconstructed from vector metadata)
    pub document: EmailDocument,
    /// Ranker-specific score; only comparable within one result list
    pub score: f64,
    /// Ranker that produced this result
    pub match_type: MatchType,
    /// Short excerpts around the match
    pub highlights: Vec<String>,
}

/// Options shared by lexical and semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// Maximum results returned
    pub limit: usize,
    /// Results scoring below this are discarded
    pub min_score: f64,
    /// Restrict to a folder (exact match)
    pub folder: Option<String>,
    /// Restrict to documents carrying this label
    pub label: Option<String>,
    /// Restrict to senders containing this substring (case-insensitive)
    pub from: Option<String>,
    /// Keep documents dated on or after this day
    pub after: Option<NaiveDate>,
    /// Keep documents dated before this day
    pub before: Option<NaiveDate>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_score: 0.0,
            folder: None,
            label: None,
            from: None,
            after: None,
            before: None,
        }
    }
}

impl SearchOptions {
    /// Options with the given result limit and everything else defaulted.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// Options for hybrid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridOptions {
    /// Shared search options
    #[serde(flatten)]
    pub search: SearchOptions,
    /// Semantic weight in `[0, 1]`; `1 - alpha` goes to the lexical ranker
    pub alpha: f64,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl HybridOptions {
    /// Hybrid options with the given alpha and default search options.
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            ..Self::default()
        }
    }
}

/// Summary of an `index` or `reindex` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents indexed
    pub documents: usize,
    /// Vector entries written
    pub chunks: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}
