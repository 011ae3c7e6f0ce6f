//! Knowledge-base storage: chunk rows and the store abstraction.
//!
//! The pipeline talks to storage through the [`KnowledgeStore`] trait so the
//! orchestrator can run against the Postgres/pgvector backend in production
//! and an in-memory stand-in under test.
//!
//! A stored row is `(id uuid, embedding vector(n), chunks text, metadata
//! jsonb)`; the metadata JSON carries the chunk provenance plus the
//! denormalized document fields, and `metadata ->> 'document_number'` is the
//! idempotency key.

pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::source::Document;
use crate::types::IngestError;

pub use postgres::PgKnowledgeStore;

/// Provenance carried on every chunk row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The document's public HTML url.
    pub source: String,
    pub document_number: String,
}

/// One embedded chunk, ready for persistence. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
    pub title: String,
    pub url: String,
    pub agency: Option<String>,
    pub publication_date: NaiveDate,
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    /// Builds a record for one chunk of `document`, assigning a fresh id.
    pub fn from_document_chunk(
        document: &Document,
        chunk_index: usize,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            chunk_index,
            embedding,
            title: document.title.clone(),
            url: document.html_url.clone(),
            agency: document.primary_agency().map(str::to_string),
            publication_date: document.publication_date,
            metadata: ChunkMetadata {
                source: document.html_url.clone(),
                document_number: document.document_number.clone(),
            },
        }
    }

    /// The row's `metadata` JSONB value: provenance plus the denormalized
    /// document fields.
    pub fn metadata_json(&self) -> serde_json::Value {
        json!({
            "source": self.metadata.source,
            "document_number": self.metadata.document_number,
            "title": self.title,
            "url": self.url,
            "agency": self.agency,
            "publication_date": self.publication_date.format("%Y-%m-%d").to_string(),
            "chunk_index": self.chunk_index,
        })
    }
}

/// Persistence contract for the knowledge base.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Point lookup by document identifier — the idempotency gate.
    async fn exists(&self, document_number: &str) -> Result<bool, IngestError>;

    /// Inserts one row per chunk inside a single transaction.
    ///
    /// A failed row is logged and dropped without aborting the batch; the
    /// surviving rows commit together. Returns the number of rows inserted.
    async fn save_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<usize, IngestError>;

    /// Releases the underlying connection. Called exactly once per run, on
    /// both the success and the failure exit path.
    async fn close(&self);
}
