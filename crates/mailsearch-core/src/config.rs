//! Production configuration constants and the engine configuration struct.
//!
//! Constants here are the reference tuning for the lexical ranker, the
//! chunker, fusion, and the indexing lifecycle. [`EngineConfig`] groups the
//! values an application typically overrides.
//!
//! # Usage
//!
//! ```
//! use mailsearch_core::config::{EngineConfig, BM25_K1, RRF_K};
//!
//! let config = EngineConfig::from_json(r#"{ "chunk_size": 800 }"#).unwrap();
//! assert_eq!(config.chunk_size, 800);
//! assert_eq!(config.chunk_overlap, 200);
//! assert_eq!(RRF_K, 60);
//! assert!(BM25_K1 > 1.0);
//! ```

use crate::error::ChunkingError;
use crate::vector::VectorStoreKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// Lexical ranking (BM25)
// =============================================================================

/// BM25 term-frequency saturation parameter.
pub const BM25_K1: f64 = 1.5;

/// BM25 document-length normalization parameter.
pub const BM25_B: f64 = 0.75;

/// Characters of context on each side of a highlighted term.
pub const HIGHLIGHT_CONTEXT_CHARS: usize = 40;

/// Maximum highlight snippets attached to a lexical result.
pub const MAX_LEXICAL_HIGHLIGHTS: usize = 3;

// =============================================================================
// Fusion
// =============================================================================

/// Reciprocal Rank Fusion constant.
///
/// Contribution of a ranker is `weight / (RRF_K + rank + 1)` with a 0-based rank.
pub const RRF_K: usize = 60;

/// Default lexical/semantic weight for hybrid search (1.0 = semantic only).
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Maximum highlight snippets attached to a fused result.
pub const MAX_HYBRID_HIGHLIGHTS: usize = 5;

/// Oversampling factor applied to the vector store limit in semantic search.
pub const SEMANTIC_OVERSAMPLE: usize = 2;

/// Oversampling factor applied to each ranker in hybrid search.
pub const HYBRID_OVERSAMPLE: usize = 3;

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 10;

// =============================================================================
// Chunking and indexing
// =============================================================================

/// Chunk window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Dimension used to lazily initialize the vector store before the first
/// embedding batch reveals the real one.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Entries per upsert batch. Batches commit independently.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Documents listed from storage during a reindex.
///
/// Reindex reads a single page of this size; larger corpora are truncated
/// (a warning is logged).
pub const REINDEX_PAGE_SIZE: usize = 10_000;

/// Chunk indices guessed when removing a document whose chunk count was
/// never recorded by this engine instance.
pub const SPECULATIVE_CHUNK_IDS: usize = 100;

/// Tunable engine settings.
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Initial vector dimension guess for lazy initialization
    pub default_dimensions: usize,
    /// Vector backend selected at construction time
    pub vector_backend: VectorStoreKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            default_dimensions: DEFAULT_EMBEDDING_DIM,
            vector_backend: VectorStoreKind::Memory,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks that the chunk window and overlap are usable.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}
