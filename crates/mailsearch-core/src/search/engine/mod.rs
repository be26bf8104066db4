//! Search engine orchestrating the lexical index, the vector store, and
//! optional document storage.
//!
//! # Architecture
//!
//! - **Lexical**: an in-process [`InvertedIndex`] owned by the engine
//! - **Semantic**: chunk vectors in a pluggable [`VectorStore`]
//! - **Storage** (optional): source of truth for raw emails, used to resolve
//!   semantic hits and to rebuild both indices on `reindex`
//!
//! The two indices are maintained side by side and are not transactional. A
//! failure after the vector upsert but before the lexical update leaves them
//! diverged; [`get_indexed_count`](SearchEngine::get_indexed_count) reports
//! the vector side and [`lexical_document_count`](SearchEngine::lexical_document_count)
//! the lexical side so the divergence is observable.
//!
//! # Lifecycle
//!
//! The vector store is initialized lazily on the first `index` call with
//! [`DEFAULT_EMBEDDING_DIM`](crate::config::DEFAULT_EMBEDDING_DIM). The first
//! embedding batch fixes the real dimension: an empty store is re-initialized
//! to match, and any later batch with a different dimension is rejected with
//! [`SearchError::DimensionMismatch`].
//!
//! # Concurrency
//!
//! Mutating operations take `&mut self`, so a single writer is enforced by
//! the borrow checker. Searches take `&self`. Hybrid search runs both rankers
//! concurrently on the current task and waits for both.
//!
//! # Example
//!
//! ```ignore
//! use mailsearch_core::search::SearchEngine;
//! use mailsearch_core::vector::InMemoryVectorStore;
//!
//! let mut engine = SearchEngine::new(
//!     EngineConfig::default(),
//!     embedder,
//!     Box::new(InMemoryVectorStore::new()),
//!     Some(storage),
//! )?;
//!
//! engine.index(&emails).await?;
//! let results = engine.search_hybrid("from:alice budget", &HybridOptions::default()).await?;
//! ```


use super::fusion::{reciprocal_rank_fusion, RRF_K};
use super::keyword::InvertedIndex;
use super::semantic::{chunk_metadata, SemanticSearcher};
use super::types::{
    DocumentId, EmailDocument, HybridOptions, IndexStats, SearchOptions, SearchResult,
};
use crate::chunking::{chunk_id, ChunkingStrategy, WindowChunker};
use crate::config::{EngineConfig, HYBRID_OVERSAMPLE, REINDEX_PAGE_SIZE, SPECULATIVE_CHUNK_IDS};
use crate::embedding::{check_batch, Embedder};
use crate::error::{ResultExt, SearchError};
use crate::query::parse_query;
use crate::storage::{DocumentStore, Pagination};
use crate::vector::{create_vector_store, VectorEntry, VectorStore};
use instant::Instant;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Hybrid email search engine.
pub struct SearchEngine {
    config: EngineConfig,
    chunker: WindowChunker,
    embedder: Arc<dyn Embedder>,
    vector_store: Box<dyn VectorStore>,
    storage: Option<Arc<dyn DocumentStore>>,
    lexical: InvertedIndex,
    /// Chunk count of every document this instance wrote to the vector store
    chunk_counts: HashMap<DocumentId, usize>,
    /// Vector store has been initialized since construction or the last close
    initialized: bool,
    /// Dimension observed in the first embedding batch
    dimension: Option<usize>,
}

impl SearchEngine {
    /// Creates an engine over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Chunking`] if the chunk window settings in
    /// `config` are unusable.
    pub fn new(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        vector_store: Box<dyn VectorStore>,
        storage: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let chunker = WindowChunker::new(config.chunk_size, config.chunk_overlap)?;
        info!(
            backend = vector_store.name(),
            chunk_size = config.chunk_size,
            storage = storage.is_some(),
            "Created search engine"
        );
        Ok(Self {
            config,
            chunker,
            embedder,
            vector_store,
            storage,
            lexical: InvertedIndex::new(),
            chunk_counts: HashMap::new(),
            initialized: false,
            dimension: None,
        })
    }

    /// Creates an engine whose vector store is selected by
    /// `config.vector_backend`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::VectorStore`] wrapping
    /// [`BackendUnavailable`](crate::error::VectorStoreError::BackendUnavailable)
    /// when the backend's driver is not part of this build.
    pub fn from_config(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        storage: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self, SearchError> {
        let vector_store = create_vector_store(config.vector_backend)
            .with_context(|| format!("Failed to create '{}' vector store", config.vector_backend))?;
        Self::new(config, embedder, vector_store, storage)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Read access to the lexical index.
    pub fn lexical_index(&self) -> &InvertedIndex {
        &self.lexical
    }

    /// Initializes the vector store for vectors of `dimensions`.
    ///
    /// Calling this again with the same dimension is a no-op.
    pub async fn initialize(&mut self, dimensions: usize) -> Result<(), SearchError> {
        self.vector_store
            .initialize(dimensions)
            .await
            .with_context(|| format!("Failed to initialize vector store ({} dims)", dimensions))?;
        self.initialized = true;
        Ok(())
    }

    async fn ensure_initialized(&mut self) -> Result<(), SearchError> {
        if !self.initialized {
            let dimensions = self.dimension.unwrap_or(self.config.default_dimensions);
            debug!(dimensions, "Lazily initializing vector store");
            self.initialize(dimensions).await?;
        }
        Ok(())
    }

    /// Records the dimension of an embedding batch, re-initializing an empty
    /// store when the initial guess was wrong.
    async fn establish_dimension(&mut self, actual: usize) -> Result<(), SearchError> {
        if let Some(expected) = self.dimension {
            if expected != actual {
                return Err(SearchError::DimensionMismatch { expected, actual });
            }
            return Ok(());
        }

        if let Some(current) = self.vector_store.dimensions() {
            if current != actual {
                let count = self
                    .vector_store
                    .count()
                    .await
                    .context("Failed to count vector entries")?;
                if count > 0 {
                    return Err(SearchError::DimensionMismatch {
                        expected: current,
                        actual,
                    });
                }
                info!(
                    guessed = current,
                    actual, "Re-initializing vector store with observed embedding dimension"
                );
                self.initialize(actual).await?;
            }
        }
        self.dimension = Some(actual);
        Ok(())
    }

    /// Indexes documents into both indices and, when configured, storage.
    ///
    /// Documents are processed in order. An error aborts the call; documents
    /// already processed stay indexed and vector batches already written stay
    /// committed.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn index(&mut self, documents: &[EmailDocument]) -> Result<IndexStats, SearchError> {
        let start = Instant::now();
        self.ensure_initialized().await?;

        let mut stats = IndexStats::default();
        for doc in documents {
            stats.chunks += self.index_document(doc, true).await?;
            stats.documents += 1;
        }
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            duration_ms = stats.duration_ms,
            "Indexed documents"
        );
        Ok(stats)
    }

    /// Chunks, embeds and stores one document. Returns the chunk count.
    async fn index_document(
        &mut self,
        doc: &EmailDocument,
        persist: bool,
    ) -> Result<usize, SearchError> {
        let chunks = self.chunker.chunk(&doc.embedding_text());
        let total = chunks.len();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .with_context(|| format!("Failed to embed document {}", doc.id))?;
        if let Some(dimension) = check_batch(texts.len(), &vectors)
            .with_context(|| format!("Invalid embeddings for document {}", doc.id))?
        {
            self.establish_dimension(dimension).await?;
        }

        // A shorter re-index would otherwise leave the old tail chunks behind
        if let Some(&previous) = self.chunk_counts.get(&doc.id) {
            let stale: Vec<String> = (0..previous)
                .map(|i| chunk_id(&doc.id, i, previous))
                .filter(|id| (0..total).all(|i| chunk_id(&doc.id, i, total) != *id))
                .collect();
            if !stale.is_empty() {
                self.vector_store
                    .delete(&stale)
                    .await
                    .with_context(|| format!("Failed to delete stale chunks of {}", doc.id))?;
            }
        }

        let entries: Vec<VectorEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorEntry {
                id: chunk_id(&doc.id, chunk.index, total),
                metadata: chunk_metadata(doc, chunk.index, total),
                vector,
                content: chunk.text,
            })
            .collect();
        self.vector_store
            .upsert(entries)
            .await
            .with_context(|| format!("Failed to upsert vectors for {}", doc.id))?;

        if persist {
            if let Some(storage) = &self.storage {
                storage
                    .save_document(doc)
                    .await
                    .with_context(|| format!("Failed to persist document {}", doc.id))?;
            }
        }

        self.lexical.index_document(doc.clone());
        self.chunk_counts.insert(doc.id.clone(), total);
        debug!(id = %doc.id, chunks = total, "Indexed document");
        Ok(total)
    }

    /// Removes a document from both indices.
    ///
    /// Storage is left untouched. Vector ids come from the chunk count
    /// recorded at indexing time; for documents this instance never indexed,
    /// the bare id plus [`SPECULATIVE_CHUNK_IDS`] chunk ids are deleted.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn remove_from_index(&mut self, id: &DocumentId) -> Result<(), SearchError> {
        self.ensure_initialized().await?;
        self.lexical.remove_document(id);

        let ids: Vec<String> = match self.chunk_counts.remove(id) {
            Some(total) => (0..total).map(|i| chunk_id(id, i, total)).collect(),
            None => {
                warn!(
                    guessed = SPECULATIVE_CHUNK_IDS,
                    "Chunk count unknown, deleting speculative chunk ids"
                );
                std::iter::once(id.to_string())
                    .chain((0..SPECULATIVE_CHUNK_IDS).map(|i| format!("{}:chunk:{}", id, i)))
                    .collect()
            }
        };

        self.vector_store
            .delete(&ids)
            .await
            .with_context(|| format!("Failed to delete vectors for {}", id))?;
        debug!(vectors = ids.len(), "Removed document from index");
        Ok(())
    }

    /// Rebuilds both indices from storage.
    ///
    /// Vectors of every tracked document are deleted and the lexical index
    /// is cleared before storage is listed. Only the first
    /// [`REINDEX_PAGE_SIZE`] documents are read; a warning is logged when
    /// storage holds more.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Precondition`] before doing any work if no
    /// document store is configured.
    #[instrument(skip_all)]
    pub async fn reindex(&mut self) -> Result<IndexStats, SearchError> {
        let storage = self.storage.clone().ok_or_else(|| {
            SearchError::Precondition("reindex requires a document store".to_string())
        })?;
        let start = Instant::now();
        self.ensure_initialized().await?;

        let tracked: Vec<String> = self
            .chunk_counts
            .iter()
            .flat_map(|(id, &total)| (0..total).map(move |i| chunk_id(id, i, total)))
            .collect();
        if !tracked.is_empty() {
            self.vector_store
                .delete(&tracked)
                .await
                .context("Failed to clear vectors before reindex")?;
        }
        self.lexical.clear();
        self.chunk_counts.clear();

        let page = storage
            .list_documents(Pagination::new(0, REINDEX_PAGE_SIZE))
            .await
            .context("Failed to list documents for reindex")?;
        if page.has_more {
            warn!(
                total = page.total,
                indexed = page.items.len(),
                "Reindex reads a single page; remaining documents were not indexed"
            );
        }

        let mut stats = IndexStats::default();
        for doc in &page.items {
            stats.chunks += self.index_document(doc, false).await?;
            stats.documents += 1;
        }
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            duration_ms = stats.duration_ms,
            "Reindex complete"
        );
        Ok(stats)
    }

    /// Number of entries in the vector store (0 before initialization).
    pub async fn get_indexed_count(&self) -> Result<usize, SearchError> {
        if !self.initialized {
            return Ok(0);
        }
        self.vector_store
            .count()
            .await
            .context("Failed to count vector entries")
    }

    /// Number of documents in the lexical index.
    pub fn lexical_document_count(&self) -> usize {
        self.lexical.len()
    }

    /// BM25 search over the lexical index.
    pub fn search_lexical(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let parsed = parse_query(query);
        self.lexical.search(&parsed, options)
    }

    /// Embedding search over the vector store.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NotInitialized`] if nothing was indexed since
    /// construction or the last [`close`](Self::close).
    pub async fn search_semantic(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if !self.initialized {
            return Err(SearchError::NotInitialized);
        }
        SemanticSearcher::new(
            self.embedder.as_ref(),
            self.vector_store.as_ref(),
            self.storage.as_deref(),
        )
        .search(query, options)
        .await
    }

    /// Fuses lexical and semantic rankings with weighted RRF.
    ///
    /// `alpha` weights the semantic ranker and `1 - alpha` the lexical one.
    /// A ranker with zero weight is not run. Each ranker fetches three times
    /// the limit; `min_score` applies to each ranker's own scores, not to the
    /// fused score.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] if `alpha` is outside `[0, 1]`.
    #[instrument(skip_all, fields(alpha = options.alpha, limit = options.search.limit))]
    pub async fn search_hybrid(
        &self,
        query: &str,
        options: &HybridOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let alpha = options.alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SearchError::InvalidQuery(format!(
                "alpha must be within [0, 1], got {}",
                alpha
            )));
        }

        let limit = options.search.limit;
        let ranker_options = SearchOptions {
            limit: limit.saturating_mul(HYBRID_OVERSAMPLE),
            ..options.search.clone()
        };

        let semantic = async {
            if alpha > 0.0 {
                self.search_semantic(query, &ranker_options).await
            } else {
                Ok(Vec::new())
            }
        };
        let lexical = async {
            if alpha < 1.0 {
                self.search_lexical(query, &ranker_options)
            } else {
                Vec::new()
            }
        };
        let (semantic, lexical) = tokio::join!(semantic, lexical);
        let semantic = semantic?;

        debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            "Fusing ranked lists"
        );
        Ok(reciprocal_rank_fusion(semantic, lexical, alpha, RRF_K, limit))
    }

    /// Closes the vector store. Safe to call more than once.
    ///
    /// Chunk tracking is dropped with the store, so removing a document that
    /// was indexed before the close falls back to speculative chunk ids. The
    /// next `index` call re-initializes the store.
    pub async fn close(&mut self) -> Result<(), SearchError> {
        self.vector_store
            .close()
            .await
            .context("Failed to close vector store")?;
        self.initialized = false;
        self.dimension = None;
        self.chunk_counts.clear();
        info!("Search engine closed");
        Ok(())
    }
}
