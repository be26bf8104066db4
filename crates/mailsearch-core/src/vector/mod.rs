//! Vector store contract and backends.
//!
//! A [`VectorStore`] holds embedded chunks of email text together with a
//! metadata map and answers cosine-similarity queries, optionally constrained
//! by a canonical [`Filter`]. Every backend honors the same semantics:
//!
//! - `initialize(dimensions)` is idempotent and fixes the vector dimension
//! - `upsert` inserts or replaces by id in batches of
//!   [`UPSERT_BATCH_SIZE`](crate::config::UPSERT_BATCH_SIZE); a failing batch
//!   leaves earlier batches committed
//! - `search` returns at most `limit` hits ordered by cosine similarity
//! - `delete` ignores ids that are not present
//! - `close` may be called repeatedly; the store is unusable until
//!   re-initialized
//!
//! Backends are chosen at construction time through [`create_vector_store`].

mod factory;
pub mod filter;
mod memory;

pub use factory::{create_vector_store, VectorStoreKind};
pub use filter::{Condition, Filter, FilterOp};
pub use memory::InMemoryVectorStore;

use crate::error::VectorStoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Free-form metadata stored alongside a vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Chunk id (`{doc}` or `{doc}:chunk:{i}`)
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
    /// Source text of the chunk
    pub content: String,
}

/// A search hit with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub entry: VectorEntry,
    pub score: f32,
}

/// Trait for vector store backends.
#[async_trait(?Send)]
pub trait VectorStore: Send + Sync {
    /// Prepares the backing collection for vectors of `dimensions`.
    async fn initialize(&self, dimensions: usize) -> Result<(), VectorStoreError>;

    /// Inserts or replaces entries by id.
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<(), VectorStoreError>;

    /// Returns up to `limit` entries ranked by cosine similarity, descending.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<VectorHit>, VectorStoreError>;

    /// Deletes entries by id.
    async fn delete(&self, ids: &[String]) -> Result<(), VectorStoreError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, VectorStoreError>;

    /// Releases the backend. Safe to call more than once.
    async fn close(&self) -> Result<(), VectorStoreError>;

    /// Dimension fixed by `initialize`, if initialized.
    fn dimensions(&self) -> Option<usize>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
