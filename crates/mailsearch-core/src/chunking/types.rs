/// A window of an email body, positioned in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 0-based position among the document's chunks
    pub index: usize,
    pub text: String,
    /// Start offset in the source text (inclusive)
    pub start_char: usize,
    /// End offset in the source text (exclusive)
    pub end_char: usize,
}
