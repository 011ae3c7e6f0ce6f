//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors surfaced by the ingestion pipeline.
///
/// Most failure points degrade in place (a failed page fetch ends pagination,
/// a failed embedding drops one chunk); the variants here are what remains
/// once a failure has to cross an API boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or malformed environment configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport failure talking to the source or embedding APIs.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A document record that cannot be interpreted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Tokenizer setup or token-window chunking failure.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// Embedding request failure for a single chunk.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Knowledge-store failure (connection, transaction, or query).
    #[error("storage error: {0}")]
    Storage(String),
}
