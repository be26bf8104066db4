//! Test utilities for mailsearch-core.
//!
//! Deterministic embedders and fixtures shared by unit tests. Only compiled
//! when running tests.

use crate::embedding::Embedder;
use crate::error::EmbeddingError;
use crate::search::types::EmailDocument;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Embeds text as keyword occurrence counts over a fixed vocabulary.
///
/// Texts sharing vocabulary words point in similar directions, which makes
/// semantic rankings predictable. Texts with no vocabulary word embed to the
/// zero vector.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Always fails with an upstream error.
pub struct FailingEmbedder;

#[async_trait(?Send)]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::RequestFailed(
            "upstream returned 503".to_string(),
        ))
    }
}

/// Returns constant vectors whose dimension can be changed between calls.
pub struct ResizableEmbedder {
    dimension: AtomicUsize,
}

impl ResizableEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: AtomicUsize::new(dimension),
        }
    }

    pub fn set_dimension(&self, dimension: usize) {
        self.dimension.store(dimension, Ordering::SeqCst);
    }
}

#[async_trait(?Send)]
impl Embedder for ResizableEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let dimension = self.dimension.load(Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0; dimension]).collect())
    }
}

/// Email fixture dated 2024-03-{day} 12:00 UTC in the inbox.
pub fn email(id: &str, from: &str, subject: &str, body: &str, day: u32) -> EmailDocument {
    let mut doc = EmailDocument::new(id, subject, body);
    doc.from = from.to_string();
    doc.to = vec!["team@example.com".to_string()];
    doc.folder = "inbox".to_string();
    doc.date = Utc
        .with_ymd_and_hms(2024, 3, day, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    doc
}
