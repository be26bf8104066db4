//! Document storage collaborator.
//!
//! The engine optionally persists raw emails through a [`DocumentStore`].
//! When present it is the source of truth: semantic search resolves hits
//! through it and `reindex` rebuilds both indices from its listing.
//!
//! # Implementations
//!
//! - [`InMemoryDocumentStore`] - `BTreeMap` storage for tests and development
//! - Database-backed stores live in the host application

use crate::search::types::{DocumentId, EmailDocument};
use std::collections::BTreeMap;
use std::sync::RwLock;

pub use crate::error::StoreError;

/// Offset/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total items across all pages
    pub total: usize,
    /// True if items exist past this page
    pub has_more: bool,
}

/// Persistent email storage.
///
/// Lookups of unknown ids return `Ok(None)`; absence is not an error.
/// Listings are ordered consistently between calls so pagination is stable.
#[async_trait::async_trait(?Send)]
pub trait DocumentStore: Send + Sync {
    /// Retrieves a document by id.
    #[must_use = "Storage lookup failures should be handled"]
    async fn get_document(&self, id: &DocumentId) -> Result<Option<EmailDocument>, StoreError>;

    /// Inserts or replaces a document.
    #[must_use = "Storage save failures should be handled"]
    async fn save_document(&self, doc: &EmailDocument) -> Result<(), StoreError>;

    /// Deletes a document. Deleting an unknown id is a no-op.
    #[must_use = "Storage delete failures should be handled"]
    async fn delete_document(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Lists documents in id order.
    #[must_use = "Storage listing failures should be handled"]
    async fn list_documents(
        &self,
        pagination: Pagination,
    ) -> Result<Page<EmailDocument>, StoreError>;
}

/// In-memory document store.
///
/// Nothing is persisted to disk.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentId, EmailDocument>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait(?Send)]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, id: &DocumentId) -> Result<Option<EmailDocument>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        Ok(documents.get(id).cloned())
    }

    async fn save_document(&self, doc: &EmailDocument) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        documents.remove(id);
        Ok(())
    }

    async fn list_documents(
        &self,
        pagination: Pagination,
    ) -> Result<Page<EmailDocument>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        let total = documents.len();
        let items: Vec<EmailDocument> = documents
            .values()
            .skip(pagination.offset)
            .take(pagination.limit)
            .cloned()
            .collect();
        let has_more = pagination.offset + items.len() < total;
        Ok(Page {
            items,
            total,
            has_more,
        })
    }
}
