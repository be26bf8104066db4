//! Embedding-based search over chunk vectors.
//!
//! A query is embedded once and matched against chunk vectors by cosine
//! similarity. The vector store is asked for twice the requested limit so that
//! collapsing chunks into documents and dropping low scores still leaves
//! enough results.
//!
//! # Filters
//!
//! Folder, label, flag and date filters are translated into the canonical
//! [`Filter`] and evaluated by the store. Substring filters (`from:`, `to:`,
//! `subject:`) have no portable store-side form and run on the resolved
//! documents instead.
//!
//! # Degraded reconstruction
//!
//! Hits are resolved through the document store when one is configured. When
//! it is not, or it no longer holds the document, a partial email is rebuilt
//! from the chunk metadata: the body is the matching chunk only, and
//! recipients and thread linkage are empty. This is expected behaviour for
//! store-less deployments, not an error. Recipients are still kept in the
//! chunk metadata so `to:` filters apply to rebuilt documents.

use super::highlight::snippet;
use super::types::{DocumentId, EmailDocument, MatchType, SearchOptions, SearchResult};
use crate::config::{HIGHLIGHT_CONTEXT_CHARS, SEMANTIC_OVERSAMPLE};
use crate::embedding::Embedder;
use crate::error::{ResultExt, SearchError};
use crate::query::{parse_query, start_of_day, SearchFilters};
use crate::storage::DocumentStore;
use crate::vector::{Filter, Metadata, VectorHit, VectorStore};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, instrument};

const META_DOCUMENT_ID: &str = "document_id";
const META_SUBJECT: &str = "subject";
const META_FROM: &str = "from";
const META_TO: &str = "to";
const META_DATE: &str = "date";
const META_DATE_TS: &str = "date_ts";
const META_FOLDER: &str = "folder";
const META_LABELS: &str = "labels";
const META_IS_READ: &str = "is_read";
const META_IS_STARRED: &str = "is_starred";
const META_HAS_ATTACHMENTS: &str = "has_attachments";
const META_CHUNK_INDEX: &str = "chunk_index";
const META_CHUNK_TOTAL: &str = "chunk_total";

/// Metadata stored with every chunk of `doc`.
pub fn chunk_metadata(doc: &EmailDocument, index: usize, total: usize) -> Metadata {
    let value = json!({
        META_DOCUMENT_ID: doc.id.as_str(),
        META_SUBJECT: doc.subject,
        META_FROM: doc.from,
        META_TO: doc.to,
        META_DATE: doc.date.to_rfc3339(),
        META_DATE_TS: doc.date.timestamp(),
        META_FOLDER: doc.folder,
        META_LABELS: doc.labels,
        META_IS_READ: doc.is_read,
        META_IS_STARRED: doc.is_starred,
        META_HAS_ATTACHMENTS: doc.has_attachments,
        META_CHUNK_INDEX: index,
        META_CHUNK_TOTAL: total,
    });
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Document id a hit belongs to.
///
/// Falls back to stripping the `:chunk:{i}` suffix from the entry id when the
/// metadata was written by something other than this crate.
pub fn hit_document_id(hit: &VectorHit) -> DocumentId {
    if let Some(id) = hit.entry.metadata.get(META_DOCUMENT_ID).and_then(Value::as_str) {
        return DocumentId::from(id);
    }
    let id = hit.entry.id.as_str();
    match id.rfind(":chunk:") {
        Some(pos) => DocumentId::from(&id[..pos]),
        None => DocumentId::from(id),
    }
}

/// Recipients recorded in chunk metadata.
pub fn metadata_recipients(metadata: &Metadata) -> Vec<String> {
    metadata
        .get(META_TO)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Rebuilds a partial email from chunk metadata.
pub fn reconstruct_document(id: DocumentId, metadata: &Metadata, content: &str) -> EmailDocument {
    let text = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let flag = |key: &str| metadata.get(key).and_then(Value::as_bool).unwrap_or(false);

    let date = metadata
        .get(META_DATE)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| {
            metadata
                .get(META_DATE_TS)
                .and_then(Value::as_i64)
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        })
        .unwrap_or_default();

    let labels = metadata
        .get(META_LABELS)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut doc = EmailDocument::new(id, &text(META_SUBJECT), content);
    doc.from = text(META_FROM);
    doc.date = date;
    doc.folder = text(META_FOLDER);
    doc.labels = labels;
    doc.is_read = flag(META_IS_READ);
    doc.is_starred = flag(META_IS_STARRED);
    doc.has_attachments = flag(META_HAS_ATTACHMENTS);
    doc
}

/// Translates the store-evaluable part of `filters` into a [`Filter`].
pub fn pushdown_filter(filters: &SearchFilters) -> Option<Filter> {
    let q = &filters.query;
    let mut filter = Filter::new();
    if let Some(folder) = &q.folder {
        filter = filter.eq(META_FOLDER, folder.as_str());
    }
    if let Some(label) = &q.label {
        filter = filter.contains(META_LABELS, label.as_str());
    }
    if let Some(after) = q.after {
        filter = filter.gte(META_DATE_TS, start_of_day(after).timestamp() as f64);
    }
    if let Some(before) = q.before {
        filter = filter.lt(META_DATE_TS, start_of_day(before).timestamp() as f64);
    }
    if let Some(read) = q.is_read {
        filter = filter.eq(META_IS_READ, read);
    }
    if let Some(starred) = q.is_starred {
        filter = filter.eq(META_IS_STARRED, starred);
    }
    if let Some(has) = q.has_attachment {
        filter = filter.eq(META_HAS_ATTACHMENTS, has);
    }
    (!filter.is_empty()).then_some(filter)
}

/// Semantic search over borrowed collaborators.
pub struct SemanticSearcher<'a> {
    embedder: &'a dyn Embedder,
    vector_store: &'a dyn VectorStore,
    storage: Option<&'a dyn DocumentStore>,
}

impl<'a> SemanticSearcher<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        vector_store: &'a dyn VectorStore,
        storage: Option<&'a dyn DocumentStore>,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            storage,
        }
    }

    /// Runs a semantic query.
    ///
    /// Field tokens are stripped before embedding; a query made only of field
    /// tokens is embedded as written. Each document appears once, scored by
    /// its best chunk, with that chunk's excerpt as the highlight.
    #[instrument(skip_all, fields(limit = options.limit))]
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let parsed = parse_query(query);
        let text = if parsed.text.trim().is_empty() {
            query
        } else {
            parsed.text.as_str()
        };

        let vector = self
            .embedder
            .embed_one(text)
            .await
            .context("Failed to embed search query")?;

        let filters = parsed.filters.merged_with(options);
        let store_filter = pushdown_filter(&filters);
        let hits = self
            .vector_store
            .search(
                &vector,
                options.limit.saturating_mul(SEMANTIC_OVERSAMPLE),
                store_filter.as_ref(),
            )
            .await
            .context("Vector store search failed")?;
        let hit_count = hits.len();

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for hit in hits {
            if results.len() >= options.limit {
                break;
            }
            let score = f64::from(hit.score);
            if score < options.min_score {
                continue;
            }
            let doc_id = hit_document_id(&hit);
            if !seen.insert(doc_id.clone()) {
                continue;
            }

            let (document, rebuilt) = self.resolve(doc_id, &hit).await?;
            let matched = if rebuilt && filters.query.to.is_some() {
                let mut view = document.clone();
                view.to = metadata_recipients(&hit.entry.metadata);
                filters.matches(&view)
            } else {
                filters.matches(&document)
            };
            if !matched {
                continue;
            }
            results.push(SearchResult {
                highlights: vec![snippet(
                    &hit.entry.content,
                    0,
                    0,
                    HIGHLIGHT_CONTEXT_CHARS * 2,
                )],
                document,
                score,
                match_type: MatchType::Semantic,
            });
        }

        debug!(
            hits = hit_count,
            results = results.len(),
            "Semantic search complete"
        );
        Ok(results)
    }

    /// Loads the hit's document, flagging whether it was rebuilt from metadata.
    async fn resolve(
        &self,
        id: DocumentId,
        hit: &VectorHit,
    ) -> Result<(EmailDocument, bool), SearchError> {
        if let Some(storage) = self.storage {
            let stored = storage
                .get_document(&id)
                .await
                .with_context(|| format!("Failed to load document {}", id))?;
            if let Some(doc) = stored {
                return Ok((doc, false));
            }
            debug!(%id, "Document missing from storage, rebuilding from metadata");
        }
        Ok((
            reconstruct_document(id, &hit.entry.metadata, &hit.entry.content),
            true,
        ))
    }
}
