//! Backend selection.
//!
//! Network backends (sqlite-vec, pgvector, Qdrant, Chroma) live in their own
//! crates so this core does not pull their SDKs. Selecting one here yields
//! [`VectorStoreError::BackendUnavailable`] at construction time, never a
//! failure on first use.
//!
//! External backends that create secondary indexes (a payload index in
//! Qdrant, an HNSW index in pgvector) treat that step as best-effort: a
//! failure is logged and `initialize` still succeeds, since search works
//! without the index, only slower.

use super::{InMemoryVectorStore, VectorStore};
use crate::error::VectorStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Known vector store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorStoreKind {
    /// In-process brute-force store
    #[default]
    Memory,
    SqliteVec,
    Pgvector,
    Qdrant,
    Chroma,
}

impl VectorStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorStoreKind::Memory => "memory",
            VectorStoreKind::SqliteVec => "sqlite-vec",
            VectorStoreKind::Pgvector => "pgvector",
            VectorStoreKind::Qdrant => "qdrant",
            VectorStoreKind::Chroma => "chroma",
        }
    }
}

impl fmt::Display for VectorStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorStoreKind {
    type Err = VectorStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(VectorStoreKind::Memory),
            "sqlite-vec" | "sqlite" => Ok(VectorStoreKind::SqliteVec),
            "pgvector" | "postgres" => Ok(VectorStoreKind::Pgvector),
            "qdrant" => Ok(VectorStoreKind::Qdrant),
            "chroma" | "chromadb" => Ok(VectorStoreKind::Chroma),
            other => Err(VectorStoreError::BackendUnavailable(format!(
                "unknown vector store backend '{}'",
                other
            ))),
        }
    }
}

/// Constructs the vector store for `kind`.
pub fn create_vector_store(kind: VectorStoreKind) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match kind {
        VectorStoreKind::Memory => {
            info!(backend = %kind, "Using in-memory vector store (brute-force search)");
            Ok(Box::new(InMemoryVectorStore::new()))
        }
        other => Err(VectorStoreError::BackendUnavailable(format!(
            "the '{}' driver is not compiled into this build",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("memory".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Memory);
        assert_eq!("Qdrant".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Qdrant);
        assert_eq!(
            "sqlite-vec".parse::<VectorStoreKind>().unwrap(),
            VectorStoreKind::SqliteVec
        );
        assert!("milvus".parse::<VectorStoreKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_serde_names() {
        for kind in [
            VectorStoreKind::Memory,
            VectorStoreKind::SqliteVec,
            VectorStoreKind::Pgvector,
            VectorStoreKind::Qdrant,
            VectorStoreKind::Chroma,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_factory_memory_and_unavailable() {
        let store = create_vector_store(VectorStoreKind::Memory).unwrap();
        assert_eq!(store.name(), "memory");

        assert!(matches!(
            create_vector_store(VectorStoreKind::Pgvector),
            Err(VectorStoreError::BackendUnavailable(_))
        ));
    }
}
