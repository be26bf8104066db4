//! Incrementally updatable inverted index with BM25 scoring.
//!
//! The index keeps, for every term, a postings map from document id to term
//! frequency together with the term's document frequency, and for every
//! document its token length. Average document length is recomputed after
//! every mutation so BM25 length normalization always reflects the current
//! corpus.
//!
//! # Scoring
//!
//! ```text
//! idf(t)      = ln(1 + (N - df + 0.5) / (df + 0.5))
//! score(t, d) = idf(t) * tf * (k1 + 1) / (tf + k1 * (1 - b + b * len(d) / avgLen))
//! ```
//!
//! with `k1 = 1.5` and `b = 0.75`. Scores are summed across query terms.
//!
//! # Invariants
//!
//! - `document_frequency == postings.len()` for every term
//! - no term has an empty postings map
//! - `avg_doc_length` is the mean length of indexed documents (0 when empty)
//!
//! # Thread Safety
//!
//! Mutations take `&mut self`; callers that share the index across tasks must
//! serialize writers themselves.

use super::highlight::extract_highlights;
use super::types::{DocumentId, EmailDocument, MatchType, SearchOptions, SearchResult};
use crate::config::{BM25_B, BM25_K1, MAX_LEXICAL_HIGHLIGHTS};
use crate::query::{tokenize, ParsedQuery};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Postings for a single term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermPostings {
    /// Number of documents containing the term
    pub document_frequency: usize,
    /// Document id to term frequency within that document
    pub postings: HashMap<DocumentId, u32>,
}

/// Token lengths recorded for an indexed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Tokens in the combined lexical text (used for BM25)
    pub length: usize,
    /// Tokens in the subject
    pub subject_length: usize,
    /// Tokens in the body
    pub body_length: usize,
    /// Tokens in the sender and recipient addresses
    pub address_length: usize,
}

/// In-memory inverted index over email documents.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: HashMap<String, TermPostings>,
    documents: HashMap<DocumentId, EmailDocument>,
    stats: HashMap<DocumentId, DocumentStats>,
    avg_doc_length: f64,
}

impl InvertedIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a document, replacing any previous version with the same id.
    #[instrument(skip_all, fields(doc_id = %doc.id))]
    pub fn index_document(&mut self, doc: EmailDocument) {
        self.insert_document(doc);
        self.recompute_average_length();
    }

    /// Indexes many documents, recomputing corpus statistics once at the end.
    pub fn index_documents<I>(&mut self, docs: I)
    where
        I: IntoIterator<Item = EmailDocument>,
    {
        let mut count = 0usize;
        for doc in docs {
            self.insert_document(doc);
            count += 1;
        }
        self.recompute_average_length();
        debug!(count, total = self.documents.len(), "Bulk loaded documents");
    }

    /// Removes a document from every postings list.
    ///
    /// Terms left without postings are dropped. Returns `false` if the id was
    /// not indexed.
    #[instrument(skip_all, fields(doc_id = %id))]
    pub fn remove_document(&mut self, id: &DocumentId) -> bool {
        let removed = self.detach_document(id);
        self.recompute_average_length();
        removed
    }

    /// Drops every document and term.
    pub fn clear(&mut self) {
        self.terms.clear();
        self.documents.clear();
        self.stats.clear();
        self.avg_doc_length = 0.0;
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no documents are indexed.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns `true` if the document is indexed.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Returns the indexed copy of a document.
    pub fn document(&self, id: &DocumentId) -> Option<&EmailDocument> {
        self.documents.get(id)
    }

    /// Ids of all indexed documents, in no particular order.
    pub fn document_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }

    /// Length statistics for a document.
    pub fn document_stats(&self, id: &DocumentId) -> Option<DocumentStats> {
        self.stats.get(id).copied()
    }

    /// Mean token length across indexed documents (0 when empty).
    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    /// Postings for a term, if any document contains it.
    pub fn postings(&self, term: &str) -> Option<&TermPostings> {
        self.terms.get(term)
    }

    /// Iterates over every term and its postings.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &TermPostings)> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Inverse document frequency for a term with document frequency `df`
    /// in a corpus of `n` documents.
    pub fn idf(n: usize, df: usize) -> f64 {
        let n = n as f64;
        let df = df as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 contribution of one term to one document.
    ///
    /// An `avg_len` of zero (empty corpus) is treated as 1.
    pub fn bm25_term_score(idf: f64, tf: u32, doc_len: usize, avg_len: f64) -> f64 {
        let avg_len = if avg_len > 0.0 { avg_len } else { 1.0 };
        let tf = f64::from(tf);
        let norm = 1.0 - BM25_B + BM25_B * (doc_len as f64 / avg_len);
        idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm)
    }

    /// Ranks documents for a parsed query.
    ///
    /// Structured filters from the query and from `options` restrict the
    /// candidate set; free-text terms produce the scores. A query with filters
    /// but no free-text terms accumulates no scores and therefore returns no
    /// results, even when documents satisfy every filter.
    #[instrument(skip_all, fields(terms = query.terms.len(), limit = options.limit))]
    pub fn search(&self, query: &ParsedQuery, options: &SearchOptions) -> Vec<SearchResult> {
        let filters = query.filters.merged_with(options);

        let candidates: Option<HashSet<&DocumentId>> = if filters.is_empty() {
            None
        } else {
            Some(
                self.documents
                    .iter()
                    .filter(|(_, doc)| filters.matches(doc))
                    .map(|(id, _)| id)
                    .collect(),
            )
        };

        let n = self.documents.len();
        let mut seen_terms = HashSet::new();
        let mut scores: HashMap<&DocumentId, f64> = HashMap::new();

        for term in &query.terms {
            if !seen_terms.insert(term.as_str()) {
                continue;
            }
            let Some(entry) = self.terms.get(term) else {
                continue;
            };
            if entry.postings.is_empty() {
                continue;
            }
            let idf = Self::idf(n, entry.document_frequency);

            for (doc_id, &tf) in &entry.postings {
                if let Some(allowed) = &candidates {
                    if !allowed.contains(doc_id) {
                        continue;
                    }
                }
                let doc_len = self.stats.get(doc_id).map(|s| s.length).unwrap_or(0);
                *scores.entry(doc_id).or_insert(0.0) +=
                    Self::bm25_term_score(idf, tf, doc_len, self.avg_doc_length);
            }
        }

        if query.is_filter_only() {
            debug!(
                candidates = candidates.as_ref().map(HashSet::len),
                "Filter-only lexical query has no terms to score"
            );
        }

        let mut ranked: Vec<(&DocumentId, f64)> = scores
            .into_iter()
            .filter(|(_, score)| *score >= options.min_score)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(options.limit);

        ranked
            .into_iter()
            .filter_map(|(id, score)| {
                let doc = self.documents.get(id)?;
                Some(SearchResult {
                    highlights: extract_highlights(&doc.body, &query.terms, MAX_LEXICAL_HIGHLIGHTS),
                    document: doc.clone(),
                    score,
                    match_type: MatchType::Lexical,
                })
            })
            .collect()
    }

    /// Adds postings for a document without touching corpus statistics.
    fn insert_document(&mut self, doc: EmailDocument) {
        // Replace semantics: clear the previous version's postings first.
        self.detach_document(&doc.id);

        let subject_tokens = tokenize(&doc.subject);
        let body_tokens = tokenize(&doc.body);
        let mut address_tokens = tokenize(&doc.from);
        for recipient in &doc.to {
            address_tokens.extend(tokenize(recipient));
        }

        let stats = DocumentStats {
            length: subject_tokens.len() + body_tokens.len() + address_tokens.len(),
            subject_length: subject_tokens.len(),
            body_length: body_tokens.len(),
            address_length: address_tokens.len(),
        };

        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for token in subject_tokens
            .into_iter()
            .chain(body_tokens)
            .chain(address_tokens)
        {
            *frequencies.entry(token).or_insert(0) += 1;
        }

        for (term, tf) in frequencies {
            let entry = self.terms.entry(term).or_default();
            entry.postings.insert(doc.id.clone(), tf);
            entry.document_frequency = entry.postings.len();
        }

        self.stats.insert(doc.id.clone(), stats);
        self.documents.insert(doc.id.clone(), doc);
    }

    /// Removes a document's postings without touching corpus statistics.
    fn detach_document(&mut self, id: &DocumentId) -> bool {
        if self.documents.remove(id).is_none() {
            return false;
        }
        self.stats.remove(id);
        self.terms.retain(|_, entry| {
            entry.postings.remove(id);
            entry.document_frequency = entry.postings.len();
            !entry.postings.is_empty()
        });
        true
    }

    fn recompute_average_length(&mut self) {
        self.avg_doc_length = if self.stats.is_empty() {
            0.0
        } else {
            let total: usize = self.stats.values().map(|s| s.length).sum();
            total as f64 / self.stats.len() as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use proptest::prelude::*;

    fn doc(id: &str, subject: &str, body: &str) -> EmailDocument {
        EmailDocument::new(id, subject, body)
    }

    fn assert_consistent(index: &InvertedIndex) {
        for (term, entry) in index.terms() {
            assert_eq!(
                entry.document_frequency,
                entry.postings.len(),
                "df mismatch for {term}"
            );
            assert!(!entry.postings.is_empty(), "empty postings for {term}");
            for id in entry.postings.keys() {
                assert!(index.contains(id), "{term} references unknown {id}");
            }
        }
        let lengths: Vec<usize> = index
            .document_ids()
            .filter_map(|id| index.document_stats(id))
            .map(|s| s.length)
            .collect();
        let expected = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };
        assert!((index.avg_doc_length() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_search_returns_matching_document() {
        let mut index = InvertedIndex::new();
        index.index_document(doc("1", "Q1 Budget Review", "Numbers for the quarter"));
        index.index_document(doc("2", "Team Standup Notes", "Yesterday and today"));

        let results = index.search(&parse_query("budget"), &SearchOptions::default());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id.as_str(), "1");
        assert!(results[0].score > 0.0);
        assert_eq!(results[0].match_type, MatchType::Lexical);
    }

    #[test]
    fn test_exact_bm25_score_at_average_length() {
        let mut index = InvertedIndex::new();
        // "project" x3 plus "status" and "weekly": 5 tokens, the corpus average.
        index.index_document(doc("1", "weekly", "project status project project"));
        assert_eq!(index.document_stats(&"1".into()).unwrap().length, 5);
        assert_eq!(index.avg_doc_length(), 5.0);

        let results = index.search(&parse_query("project"), &SearchOptions::default());

        // N = 1, df = 1: idf = ln(1 + 0.5 / 1.5) = ln(4/3)
        // len == avgLen: norm = 1, so tf part = 3 * 2.5 / (3 + 1.5) = 5/3
        let expected = (4.0f64 / 3.0).ln() * (7.5 / 4.5);
        assert_eq!(results.len(), 1);
        assert!((results[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_remove_document_clears_postings() {
        let mut index = InvertedIndex::new();
        index.index_document(doc("1", "Confidential", "merger details"));
        index.index_document(doc("2", "Lunch", "merger rumors at lunch"));

        assert!(index.remove_document(&"1".into()));
        assert!(!index.remove_document(&"1".into()));

        assert!(index.postings("confidential").is_none());
        assert_eq!(index.postings("merger").unwrap().document_frequency, 1);
        assert!(index
            .search(&parse_query("confidential"), &SearchOptions::default())
            .is_empty());
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_last_document_zeroes_average() {
        let mut index = InvertedIndex::new();
        index.index_document(doc("1", "only", "document here"));
        index.remove_document(&"1".into());

        assert!(index.is_empty());
        assert_eq!(index.term_count(), 0);
        assert_eq!(index.avg_doc_length(), 0.0);
    }

    #[test]
    fn test_reindex_same_id_replaces_terms() {
        let mut index = InvertedIndex::new();
        index.index_document(doc("1", "Draft", "old wording"));
        index.index_document(doc("1", "Final", "new wording"));

        assert_eq!(index.len(), 1);
        assert!(index.postings("old").is_none());
        assert!(index.postings("draft").is_none());
        assert_eq!(index.postings("wording").unwrap().postings[&DocumentId::from("1")], 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_from_filter_restricts_candidates() {
        let mut index = InvertedIndex::new();
        let mut a = doc("a", "Budget", "budget approved");
        a.from = "Alice@Example.com".to_string();
        let mut b = doc("b", "Budget", "budget rejected");
        b.from = "bob@example.com".to_string();
        let mut c = doc("c", "Holiday", "out of office");
        c.from = "alice@example.com".to_string();
        index.index_documents(vec![a, b, c]);

        let results = index.search(
            &parse_query("from:alice@example.com budget"),
            &SearchOptions::default(),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id.as_str(), "a");
    }

    #[test]
    fn test_filter_only_query_returns_nothing() {
        let mut index = InvertedIndex::new();
        let mut a = doc("a", "Invoice", "see attached");
        a.has_attachments = true;
        index.index_document(a);

        let results = index.search(
            &parse_query("is:unread has:attachment"),
            &SearchOptions::default(),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_option_filters_apply() {
        let mut index = InvertedIndex::new();
        let mut a = doc("a", "Report", "quarterly report");
        a.folder = "inbox".to_string();
        a.labels = vec!["finance".to_string()];
        let mut b = doc("b", "Report", "quarterly report draft");
        b.folder = "archive".to_string();
        index.index_documents(vec![a, b]);

        let options = SearchOptions {
            folder: Some("archive".to_string()),
            ..SearchOptions::default()
        };
        let results = index.search(&parse_query("report"), &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id.as_str(), "b");

        let options = SearchOptions {
            label: Some("finance".to_string()),
            ..SearchOptions::default()
        };
        let results = index.search(&parse_query("report"), &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id.as_str(), "a");
    }

    #[test]
    fn test_min_score_and_limit() {
        let mut index = InvertedIndex::new();
        for i in 0..10 {
            index.index_document(doc(&i.to_string(), "meeting", &"agenda ".repeat(i + 1)));
        }

        let limited = index.search(&parse_query("agenda"), &SearchOptions::with_limit(3));
        assert_eq!(limited.len(), 3);
        assert!(limited.windows(2).all(|w| w[0].score >= w[1].score));

        let strict = SearchOptions {
            min_score: f64::MAX,
            ..SearchOptions::default()
        };
        assert!(index.search(&parse_query("agenda"), &strict).is_empty());
    }

    #[test]
    fn test_ties_break_by_document_id() {
        let mut index = InvertedIndex::new();
        index.index_document(doc("b", "same", "identical text"));
        index.index_document(doc("a", "same", "identical text"));

        let results = index.search(&parse_query("identical"), &SearchOptions::default());
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_highlights_from_body() {
        let mut index = InvertedIndex::new();
        index.index_document(doc(
            "1",
            "Budget",
            "Please review the budget before Friday and share the forecast numbers",
        ));

        let results = index.search(&parse_query("budget forecast"), &SearchOptions::default());
        assert_eq!(results[0].highlights.len(), 2);
        assert!(results[0].highlights[0].contains("budget"));
        assert!(results[0].highlights[1].contains("forecast"));
    }

    #[test]
    fn test_repeated_query_terms_highlight_once() {
        let mut index = InvertedIndex::new();
        index.index_document(doc(
            "1",
            "Budget",
            "Please review the budget before Friday and share the forecast numbers",
        ));

        let once = index.search(&parse_query("budget forecast"), &SearchOptions::default());
        let repeated = index.search(
            &parse_query("budget budget forecast"),
            &SearchOptions::default(),
        );

        assert_eq!(repeated[0].highlights, once[0].highlights);
        assert!((repeated[0].score - once[0].score).abs() < 1e-12);
    }

    #[test]
    fn test_idf_decreases_with_document_frequency() {
        let n = 100;
        let mut previous = f64::INFINITY;
        for df in 1..=n {
            let idf = InvertedIndex::idf(n, df);
            assert!(idf < previous);
            assert!(idf > 0.0);
            previous = idf;
        }
        assert!(InvertedIndex::idf(n, n) < 0.01);
    }

    proptest! {
        #[test]
        fn prop_bm25_non_decreasing_in_tf(
            tf in 0u32..500,
            doc_len in 1usize..2000,
            avg_len in 1.0f64..2000.0,
            df in 1usize..100,
        ) {
            let idf = InvertedIndex::idf(100, df);
            let lower = InvertedIndex::bm25_term_score(idf, tf, doc_len, avg_len);
            let higher = InvertedIndex::bm25_term_score(idf, tf + 1, doc_len, avg_len);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_removal_keeps_invariants(
            bodies in proptest::collection::vec("[a-e]{2,3}( [a-e]{2,3}){0,6}", 1..8),
            remove_mask in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let mut index = InvertedIndex::new();
            for (i, body) in bodies.iter().enumerate() {
                index.index_document(doc(&format!("d{i}"), "", body));
            }
            for (i, remove) in remove_mask.iter().enumerate().take(bodies.len()) {
                if *remove {
                    let id = DocumentId::new(format!("d{i}"));
                    index.remove_document(&id);
                    for (_, entry) in index.terms() {
                        prop_assert!(!entry.postings.contains_key(&id));
                    }
                }
            }
            assert_consistent(&index);
        }
    }
}
