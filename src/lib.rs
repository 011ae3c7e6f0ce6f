//! ```text
//! Listing API ──► source::SourceClient ──► deduped, capped Vec<Document>
//!                                              │
//! Detail API ──► extract::TextExtractor ──────► full text (plain)
//!                                              │
//!                chunking::TokenChunker ──────► overlapping token windows
//!                                              │
//!                embeddings::EmbeddingProvider ► one vector per chunk
//!                                              │
//!                stores::KnowledgeStore ──────► pgvector rows (idempotent
//!                                               per document_number)
//! ```
//!
//! The pipeline is composed by [`pipeline::IngestionOrchestrator`] and
//! invoked through [`runner::handle`], which owns the store connection for
//! the duration of one run.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod pipeline;
pub mod runner;
pub mod source;
pub mod stores;
pub mod types;

pub use chunking::TokenChunker;
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider};
pub use pipeline::{DocumentOutcome, IngestionOrchestrator, RunSummary};
pub use source::{Document, FetchQuery, SourceClient};
pub use stores::{ChunkRecord, KnowledgeStore, PgKnowledgeStore};
pub use types::IngestError;
