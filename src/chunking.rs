//! Token-window chunking sized to the embedding model's context limit.

use tiktoken_rs::{CoreBPE, get_bpe_from_model};

use crate::types::IngestError;

pub const DEFAULT_MAX_TOKENS: usize = 512;
pub const DEFAULT_OVERLAP: usize = 50;

/// Splits text into overlapping token windows using the embedding model's
/// own tokenizer.
///
/// A window of `max_tokens` tokens slides with stride `max_tokens - overlap`
/// until the window start passes the end of the token sequence, so adjacent
/// chunks share exactly `overlap` tokens and the final chunk may be shorter.
/// Chunk order equals left-to-right position in the source text.
pub struct TokenChunker {
    bpe: CoreBPE,
    max_tokens: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Builds a chunker for the named embedding model.
    ///
    /// `overlap` must be strictly smaller than `max_tokens` — otherwise the
    /// stride would be non-positive and the window would never advance.
    pub fn new(model: &str, max_tokens: usize, overlap: usize) -> Result<Self, IngestError> {
        if max_tokens == 0 {
            return Err(IngestError::Chunking(
                "max_tokens must be positive".to_string(),
            ));
        }
        if overlap >= max_tokens {
            return Err(IngestError::Chunking(format!(
                "overlap {overlap} must be smaller than max_tokens {max_tokens}"
            )));
        }
        let bpe = get_bpe_from_model(model).map_err(|err| IngestError::Chunking(err.to_string()))?;
        Ok(Self {
            bpe,
            max_tokens,
            overlap,
        })
    }

    /// Chunker with the production window for the named model.
    pub fn for_model(model: &str) -> Result<Self, IngestError> {
        Self::new(model, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Splits `text` into overlapping chunks, each decoded back to text.
    ///
    /// Empty input produces zero chunks; input shorter than the window
    /// produces exactly one chunk equal to the whole text.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, IngestError> {
        let tokens = self.bpe.encode_ordinary(text);
        let stride = self.max_tokens - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < tokens.len() {
            let end = (start + self.max_tokens).min(tokens.len());
            let window = tokens[start..end].to_vec();
            let decoded = self
                .bpe
                .decode(window)
                .map_err(|err| IngestError::Chunking(err.to_string()))?;
            chunks.push(decoded);
            start += stride;
        }
        Ok(chunks)
    }
}
