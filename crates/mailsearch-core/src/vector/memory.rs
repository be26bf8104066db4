// In-process reference vector store (brute-force cosine scan)

use super::{cosine_similarity, Filter, VectorEntry, VectorHit, VectorStore};
use crate::config::UPSERT_BATCH_SIZE;
use crate::error::VectorStoreError;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct State {
    dimensions: Option<usize>,
    entries: HashMap<String, VectorEntry>,
}

/// Vector store backed by a `HashMap`.
///
/// Search compares the query against every stored vector, so latency grows
/// linearly with the number of entries and the store cannot be shared across
/// processes. It is the baseline every other backend is tested against, and
/// is adequate for mailboxes in the tens of thousands of chunks.
///
/// Closing the store discards all entries.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    state: RwLock<State>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> VectorStoreError {
    VectorStoreError::Backend(format!("Lock poisoned: {}", e))
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self, dimensions: usize) -> Result<(), VectorStoreError> {
        if dimensions == 0 {
            return Err(VectorStoreError::Backend(
                "vector dimension must be greater than 0".to_string(),
            ));
        }
        let mut state = self.state.write().map_err(poisoned)?;
        match state.dimensions {
            Some(current) if current == dimensions => {}
            Some(current) if !state.entries.is_empty() => {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: current,
                    actual: dimensions,
                });
            }
            _ => {
                debug!(dimensions, "Initialized in-memory vector store");
                state.dimensions = Some(dimensions);
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(entries = entries.len()))]
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), VectorStoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let dimensions = state.dimensions.ok_or(VectorStoreError::NotInitialized)?;

        let mut remaining = entries.into_iter();
        loop {
            let batch: Vec<VectorEntry> = remaining.by_ref().take(UPSERT_BATCH_SIZE).collect();
            if batch.is_empty() {
                break;
            }
            if let Some(bad) = batch.iter().find(|e| e.vector.len() != dimensions) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimensions,
                    actual: bad.vector.len(),
                });
            }
            for entry in batch {
                state.entries.insert(entry.id.clone(), entry);
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(limit = limit, filtered = filter.is_some()))]
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<VectorHit>, VectorStoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let dimensions = state.dimensions.ok_or(VectorStoreError::NotInitialized)?;
        if vector.len() != dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<VectorHit> = state
            .entries
            .values()
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.metadata)))
            .map(|entry| VectorHit {
                score: cosine_similarity(vector, &entry.vector),
                entry: entry.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorStoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.dimensions.is_none() {
            return Err(VectorStoreError::NotInitialized);
        }
        for id in ids {
            state.entries.remove(id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        let state = self.state.read().map_err(poisoned)?;
        if state.dimensions.is_none() {
            return Err(VectorStoreError::NotInitialized);
        }
        Ok(state.entries.len())
    }

    async fn close(&self) -> Result<(), VectorStoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.entries.clear();
        state.dimensions = None;
        Ok(())
    }

    fn dimensions(&self) -> Option<usize> {
        self.state.read().ok().and_then(|s| s.dimensions)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
