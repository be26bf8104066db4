//! Error types for mailsearch-core.
//!
//! Each external collaborator (embedding model, vector store, document
//! storage) has its own error enum. Engine operations return [`SearchError`],
//! which wraps collaborator failures with a context message while keeping the
//! original error intact as its `source`.

use thiserror::Error;

/// Errors produced by an embedding collaborator.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Upstream model or API call failed
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),
    /// The collaborator returned a different number of vectors than inputs
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of input texts
        expected: usize,
        /// Number of vectors returned
        actual: usize,
    },
    /// Input rejected before calling the model
    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),
}

/// Errors produced by a vector store backend.
#[derive(Debug, Clone, Error)]
pub enum VectorStoreError {
    /// Operation attempted before `initialize` (or after `close`)
    #[error("Vector store not initialized")]
    NotInitialized,
    /// Vector dimensionality does not match the store's fixed dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed at initialization
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },
    /// The requested backend's driver is not compiled into this build
    #[error("Vector store backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Backend RPC or query failure
    #[error("Vector store backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during document storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Errors that can occur during text chunking.
#[derive(Debug, Clone, Error)]
pub enum ChunkingError {
    /// Invalid chunking configuration
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
}

/// Errors returned by search engine operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The vector store has not been initialized yet
    #[error("Search index not initialized")]
    NotInitialized,
    /// Embedding collaborator failure
    #[error("{context}: {source}")]
    Embedding {
        /// What the engine was doing
        context: String,
        /// Original collaborator error
        #[source]
        source: EmbeddingError,
    },
    /// Vector store collaborator failure
    #[error("{context}: {source}")]
    VectorStore {
        /// What the engine was doing
        context: String,
        /// Original collaborator error
        #[source]
        source: VectorStoreError,
    },
    /// Document storage collaborator failure
    #[error("{context}: {source}")]
    Storage {
        /// What the engine was doing
        context: String,
        /// Original collaborator error
        #[source]
        source: StoreError,
    },
    /// A required precondition is not met; raised before any work starts
    #[error("Precondition failed: {0}")]
    Precondition(String),
    /// Invalid search query or options
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Embedding dimensionality changed after it was established
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Established dimension
        expected: usize,
        /// Dimension of the new batch
        actual: usize,
    },
    /// Chunker misconfiguration
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
}

impl SearchError {
    /// Returns true if this error originated in the embedding collaborator.
    pub fn is_embedding(&self) -> bool {
        matches!(self, SearchError::Embedding { .. })
    }

    /// Returns true if this error originated in the vector store collaborator.
    pub fn is_vector_store(&self) -> bool {
        matches!(self, SearchError::VectorStore { .. })
    }
}

/// Extension trait for wrapping collaborator errors with context.
///
/// ```ignore
/// let vectors = embedder.embed(&texts).await.context("Failed to embed chunks")?;
/// ```
pub trait ResultExt<T> {
    /// Wraps the error into a [`SearchError`] with the given context.
    fn context(self, context: &str) -> Result<T, SearchError>;

    /// Like [`context`](Self::context) but builds the message lazily.
    fn with_context<F>(self, f: F) -> Result<T, SearchError>
    where
        F: FnOnce() -> String;
}

macro_rules! impl_result_ext {
    ($err:ty, $variant:ident) => {
        impl<T> ResultExt<T> for Result<T, $err> {
            fn context(self, context: &str) -> Result<T, SearchError> {
                self.map_err(|source| SearchError::$variant {
                    context: context.to_string(),
                    source,
                })
            }

            fn with_context<F>(self, f: F) -> Result<T, SearchError>
            where
                F: FnOnce() -> String,
            {
                self.map_err(|source| SearchError::$variant {
                    context: f(),
                    source,
                })
            }
        }
    };
}

impl_result_ext!(EmbeddingError, Embedding);
impl_result_ext!(VectorStoreError, VectorStore);
impl_result_ext!(StoreError, Storage);
