//! Text chunking for embedding.
//!
//! Long email bodies are split into overlapping character windows so each
//! piece fits the embedding model's input limit. The default strategy,
//! [`WindowChunker`], prefers to end a window at a sentence boundary close to
//! the window limit and falls back to a hard character cut.
//!
//! Chunk identifiers in the vector store follow [`chunk_id`]: the bare
//! document id when a document produced one chunk, `{id}:chunk:{index}`
//! otherwise.

mod types;

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::ChunkingError;
use crate::search::types::DocumentId;
use tracing::debug;

pub use types::TextChunk;

/// Trait for text chunking strategies.
///
/// Implementations must return at least one chunk (an empty input yields one
/// empty chunk) ordered by position in the source text.
pub trait ChunkingStrategy: Send + Sync {
    /// Splits text into chunks according to this strategy.
    fn chunk(&self, text: &str) -> Vec<TextChunk>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &'static str;

    /// Returns the maximum characters per chunk.
    fn window_size(&self) -> usize;
}

/// Vector-store id for chunk `index` of a document split into `total` chunks.
pub fn chunk_id(document_id: &DocumentId, index: usize, total: usize) -> String {
    if total <= 1 {
        document_id.as_str().to_string()
    } else {
        format!("{}:chunk:{}", document_id, index)
    }
}

/// Fixed-size character windows with overlap and sentence-boundary snapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChunker {
    size: usize,
    overlap: usize,
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl WindowChunker {
    /// Creates a chunker with the given window size and overlap (characters).
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] if `size` is zero or
    /// `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= size {
            return Err(ChunkingError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    /// Overlap between consecutive windows in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Finds the last sentence end in the back half of `[start, end)`.
    ///
    /// Returns the index one past the terminating character.
    fn sentence_boundary(&self, chars: &[char], start: usize, end: usize) -> Option<usize> {
        let floor = start + self.size / 2;
        (floor..end).rev().find_map(|i| {
            let terminal = matches!(chars[i], '.' | '!' | '?' | '\n');
            let followed_by_space = chars.get(i + 1).map_or(true, |c| c.is_whitespace());
            (terminal && followed_by_space).then_some(i + 1)
        })
    }
}

impl ChunkingStrategy for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.size {
            return vec![TextChunk {
                index: 0,
                text: text.to_string(),
                start_char: 0,
                end_char: chars.len(),
            }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let limit = (start + self.size).min(chars.len());
            let end = if limit == chars.len() {
                limit
            } else {
                self.sentence_boundary(&chars, start, limit)
                    .unwrap_or(limit)
            };

            chunks.push(TextChunk {
                index: chunks.len(),
                text: chars[start..end].iter().collect(),
                start_char: start,
                end_char: end,
            });

            if end == chars.len() {
                break;
            }
            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        debug!(
            chars = chars.len(),
            chunks = chunks.len(),
            "Split text into overlapping windows"
        );
        chunks
    }

    fn name(&self) -> &'static str {
        "window"
    }

    fn window_size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = WindowChunker::default();
        let chunks = chunker.chunk("Short email body.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short email body.");
    }

    #[test]
    fn test_empty_text_yields_one_empty_chunk() {
        let chunks = WindowChunker::default().chunk("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_text_exactly_window_size() {
        let text = "x".repeat(1000);
        let chunks = WindowChunker::default().chunk(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_hard_split_with_overlap() {
        let chunker = WindowChunker::new(10, 3).unwrap();
        let chunks = chunker.chunk("abcdefghijklmnopqrstuvwxyz");

        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].start_char, 7);
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks.last().unwrap().end_char, 26);
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let chunker = WindowChunker::new(36, 5).unwrap();
        let text = "The budget is final. Next we discuss hiring plans for the team.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks[0].text, "The budget is final.");
        assert!(chunks.len() >= 2);
        assert_eq!(chunks.last().unwrap().end_char, text.chars().count());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(WindowChunker::new(0, 0).is_err());
        assert!(WindowChunker::new(100, 100).is_err());
        assert!(WindowChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_chunk_ids() {
        let id = DocumentId::from("msg-1");
        assert_eq!(chunk_id(&id, 0, 1), "msg-1");
        assert_eq!(chunk_id(&id, 0, 3), "msg-1:chunk:0");
        assert_eq!(chunk_id(&id, 2, 3), "msg-1:chunk:2");
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_text_in_order(
            text in "[a-z .!?\n]{0,400}",
            size in 20usize..120,
            overlap_pct in 0usize..50,
        ) {
            let overlap = size * overlap_pct / 100;
            let chunker = WindowChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&text);
            let total = text.chars().count();

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start_char, 0);
            prop_assert_eq!(chunks.last().unwrap().end_char, total);
            for window in chunks.windows(2) {
                prop_assert!(window[1].start_char > window[0].start_char);
                prop_assert!(window[1].start_char <= window[0].end_char);
            }
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert!(chunk.text.chars().count() <= size);
            }
        }
    }
}
