//! Embedding collaborator contract.
//!
//! The search core never runs a model itself. An [`Embedder`] turns texts
//! into vectors (a local model, a hosted API, or a test double) and the
//! engine treats every call as a suspension point.

use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Trait for embedding collaborators.
///
/// `embed` must return exactly one vector per input text, in input order, and
/// every vector from one collaborator must share the same dimension. Retries
/// for transient upstream failures belong in the implementation; the engine
/// does not retry.
///
/// # Examples
///
/// ```ignore
/// let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(endpoint));
///
/// let vectors = embedder.embed(&["quarterly budget".to_string()]).await?;
/// assert_eq!(vectors.len(), 1);
/// ```
#[async_trait(?Send)]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            n => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: n,
            }),
        }
    }
}

/// Checks that a collaborator honored the one-vector-per-input contract.
pub(crate) fn check_batch(
    inputs: usize,
    vectors: &[Vec<f32>],
) -> Result<Option<usize>, EmbeddingError> {
    if vectors.len() != inputs {
        return Err(EmbeddingError::CountMismatch {
            expected: inputs,
            actual: vectors.len(),
        });
    }
    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let dim = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbeddingError::InvalidInput(format!(
            "embedding batch mixes dimensions {} and {}",
            dim,
            bad.len()
        )));
    }
    Ok(Some(dim))
}
