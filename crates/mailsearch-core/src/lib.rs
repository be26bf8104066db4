//! # Mailsearch Core
//!
//! Hybrid retrieval over email: BM25 over an incrementally updated inverted
//! index, embedding similarity over a pluggable vector store, and weighted
//! reciprocal rank fusion of the two.
//!
//! The crate owns no model and no network client. Embeddings come from an
//! [`Embedder`](embedding::Embedder) supplied by the host, vectors live in a
//! [`VectorStore`](vector::VectorStore), and raw emails optionally live in a
//! [`DocumentStore`](storage::DocumentStore).
//!
//! ## Modules
//!
//! - [`search`] - Lexical, semantic and hybrid search plus the [`SearchEngine`]
//! - [`query`] - Query mini-language (`from:`, `is:unread`, `after:`, ...)
//! - [`chunking`] - Overlapping character windows for embedding
//! - [`vector`] - Vector store contract, filter AST, in-memory backend
//! - [`storage`] - Document storage contract
//! - [`embedding`] - Embedding collaborator contract
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod query;
pub mod search;
pub mod storage;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::EngineConfig;
pub use error::SearchError;
pub use search::{
    DocumentId, EmailDocument, HybridOptions, MatchType, SearchEngine, SearchOptions, SearchResult,
};
