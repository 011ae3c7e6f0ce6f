//! The ingestion orchestrator: per-document state machine and run summary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chunking::TokenChunker;
use crate::embeddings::EmbeddingProvider;
use crate::extract::TextExtractor;
use crate::source::{Document, FetchQuery, SourceClient};
use crate::stores::{ChunkRecord, KnowledgeStore};
use crate::types::IngestError;

/// Terminal state of one document's pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Already present in the store; nothing written.
    Skipped,
    /// No detail record, no full-text resource, or empty extraction.
    NoFullText,
    /// Chunks were produced but none survived embedding.
    NothingPersisted,
    /// At least one chunk row written.
    Persisted { stored: usize, dropped: usize },
}

/// Aggregated result of one ingestion run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub fetched: usize,
    pub persisted_documents: usize,
    pub skipped_documents: usize,
    pub no_full_text: usize,
    pub empty_documents: usize,
    pub chunks_stored: usize,
    pub chunks_dropped: usize,
    /// Per-document outcomes in processing order.
    pub outcomes: Vec<(String, DocumentOutcome)>,
}

impl RunSummary {
    fn new(fetched: usize) -> Self {
        Self {
            fetched,
            ..Self::default()
        }
    }

    fn record(&mut self, document_number: String, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Skipped => self.skipped_documents += 1,
            DocumentOutcome::NoFullText => self.no_full_text += 1,
            DocumentOutcome::NothingPersisted => self.empty_documents += 1,
            DocumentOutcome::Persisted { stored, dropped } => {
                self.persisted_documents += 1;
                self.chunks_stored += stored;
                self.chunks_dropped += dropped;
            }
        }
        self.outcomes.push((document_number, outcome));
    }
}

/// Composes source, extractor, chunker, embedder and store into the
/// sequential per-document pipeline.
///
/// Documents are processed strictly one at a time, chunks within a document
/// strictly in order, with a fixed pause after every document to respect the
/// embedding service's rate limit.
pub struct IngestionOrchestrator {
    source: SourceClient,
    extractor: TextExtractor,
    chunker: TokenChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn KnowledgeStore>,
    pause: Duration,
}

impl IngestionOrchestrator {
    pub fn new(
        source: SourceClient,
        extractor: TextExtractor,
        chunker: TokenChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn KnowledgeStore>,
        pause: Duration,
    ) -> Self {
        Self {
            source,
            extractor,
            chunker,
            embedder,
            store,
            pause,
        }
    }

    /// Fetches the document listing and runs every document through the
    /// pipeline, pausing after each one regardless of outcome.
    ///
    /// Store errors abort the run; everything else degrades per document.
    pub async fn run(&self, query: &FetchQuery) -> Result<RunSummary, IngestError> {
        let documents = self.source.fetch_documents(query).await;
        let mut summary = RunSummary::new(documents.len());

        for document in &documents {
            let title: String = document.title.chars().take(80).collect();
            info!(document_number = %document.document_number, %title, "processing document");

            let outcome = self.process_document(document).await?;
            debug!(document_number = %document.document_number, ?outcome, "document finished");
            summary.record(document.document_number.clone(), outcome);

            tokio::time::sleep(self.pause).await;
        }

        info!(
            fetched = summary.fetched,
            persisted = summary.persisted_documents,
            skipped = summary.skipped_documents,
            no_full_text = summary.no_full_text,
            chunks_stored = summary.chunks_stored,
            chunks_dropped = summary.chunks_dropped,
            "ingestion run complete"
        );
        Ok(summary)
    }

    /// One document's pass: skip-if-exists, fetch details, extract, chunk,
    /// embed each chunk, persist the survivors.
    pub async fn process_document(
        &self,
        document: &Document,
    ) -> Result<DocumentOutcome, IngestError> {
        if self.store.exists(&document.document_number).await? {
            info!(document_number = %document.document_number, "document already ingested; skipping");
            return Ok(DocumentOutcome::Skipped);
        }

        let Some(detail) = self.extractor.fetch_details(&document.document_number).await else {
            return Ok(DocumentOutcome::NoFullText);
        };
        if detail.full_text_xml_url.is_none() {
            info!(document_number = %document.document_number, "no full-text resource available");
            return Ok(DocumentOutcome::NoFullText);
        }

        let full_text = self.extractor.extract_full_text(&detail).await;
        if full_text.is_empty() {
            return Ok(DocumentOutcome::NoFullText);
        }

        let chunks = self.chunker.chunk(&full_text)?;
        let total = chunks.len();
        let mut records = Vec::with_capacity(total);
        let mut dropped = 0usize;
        for (chunk_index, content) in chunks.into_iter().enumerate() {
            match self.embedder.embed(&content).await {
                Ok(embedding) => {
                    records.push(ChunkRecord::from_document_chunk(
                        document,
                        chunk_index,
                        content,
                        embedding,
                    ));
                }
                Err(err) => {
                    dropped += 1;
                    warn!(
                        document_number = %document.document_number,
                        chunk_index,
                        error = %err,
                        "embedding failed; dropping chunk"
                    );
                }
            }
        }

        if records.is_empty() {
            warn!(
                document_number = %document.document_number,
                chunks = total,
                "no chunks survived embedding"
            );
            return Ok(DocumentOutcome::NothingPersisted);
        }

        let stored = self.store.save_chunks(records).await?;
        Ok(DocumentOutcome::Persisted { stored, dropped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tallies_outcomes() {
        let mut summary = RunSummary::new(4);
        summary.record("A".to_string(), DocumentOutcome::Skipped);
        summary.record("B".to_string(), DocumentOutcome::NoFullText);
        summary.record(
            "C".to_string(),
            DocumentOutcome::Persisted {
                stored: 3,
                dropped: 1,
            },
        );
        summary.record("D".to_string(), DocumentOutcome::NothingPersisted);

        assert_eq!(summary.fetched, 4);
        assert_eq!(summary.skipped_documents, 1);
        assert_eq!(summary.no_full_text, 1);
        assert_eq!(summary.persisted_documents, 1);
        assert_eq!(summary.empty_documents, 1);
        assert_eq!(summary.chunks_stored, 3);
        assert_eq!(summary.chunks_dropped, 1);
        assert_eq!(summary.outcomes.len(), 4);
        assert_eq!(summary.outcomes[2].0, "C");
    }
}
