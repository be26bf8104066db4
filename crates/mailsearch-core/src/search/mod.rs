//! Hybrid email search combining lexical and semantic ranking.
//!
//! # Architecture
//!
//! - `types`: Core types (DocumentId, EmailDocument, SearchResult, options)
//! - `keyword`: Inverted index with BM25 scoring
//! - `highlight`: Snippet extraction around matched terms
//! - `semantic`: Embedding search over chunk vectors
//! - `fusion`: Weighted Reciprocal Rank Fusion for merging rankings
//! - `engine`: SearchEngine orchestrating indexing and all three search modes
//!
//! # Usage
//!
//! ```ignore
//! use mailsearch_core::search::{HybridOptions, SearchEngine};
//!
//! engine.index(&emails).await?;
//!
//! let lexical = engine.search_lexical("from:alice budget", &SearchOptions::default());
//! let semantic = engine.search_semantic("plans for the offsite", &SearchOptions::default()).await?;
//! let hybrid = engine.search_hybrid("budget after:2024-01-01", &HybridOptions::with_alpha(0.7)).await?;
//! ```
//!
//! # Algorithm Details
//!
//! **BM25**: `k1 = 1.5`, `b = 0.75`, document length counted in tokens over
//! subject, body, sender and recipients.
//!
//! **Semantic**: cosine similarity between the query embedding and chunk
//! embeddings; a document scores as its best chunk.
//!
//! **RRF**: `alpha / (60 + rank_sem + 1) + (1 - alpha) / (60 + rank_lex + 1)`
//! with 0-based ranks; only ranks matter, so the two score scales never need
//! normalizing.

pub mod types;

mod engine;
pub mod fusion;
pub mod highlight;
pub mod keyword;
pub mod semantic;

pub use engine::SearchEngine;
pub use keyword::InvertedIndex;
pub use types::{
    DocumentId, EmailDocument, HybridOptions, IndexStats, MatchType, SearchOptions, SearchResult,
};
