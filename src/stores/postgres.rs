//! Postgres/pgvector implementation of the knowledge store.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::Acquire;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::types::IngestError;

use super::{ChunkRecord, KnowledgeStore};

/// Knowledge store over a sqlx connection pool.
///
/// The pool is opened once per run and closed exactly once via
/// [`KnowledgeStore::close`], on every exit path.
pub struct PgKnowledgeStore {
    pool: PgPool,
    table: String,
}

impl PgKnowledgeStore {
    /// Connects using the environment-sourced database settings.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, IngestError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage)?;
        debug!(host = %config.host, database = %config.name, table = %config.table, "knowledge store connected");
        Ok(Self {
            pool,
            table: config.table.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the `vector` extension, the chunk table, and an expression
    /// index on the idempotency key if they do not exist yet.
    pub async fn ensure_table(&self, dimensions: usize) -> Result<(), IngestError> {
        if dimensions == 0 {
            return Err(IngestError::Storage(
                "embedding dimension must be positive".to_string(),
            ));
        }
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id uuid PRIMARY KEY,
                embedding vector({dimensions}),
                chunks text NOT NULL,
                metadata jsonb NOT NULL
            )",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await.map_err(storage)?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS {}_document_number_idx ON {} ((metadata ->> 'document_number'))",
            self.table.replace('.', "_"),
            self.table
        );
        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for PgKnowledgeStore {
    async fn exists(&self, document_number: &str) -> Result<bool, IngestError> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE metadata ->> 'document_number' = $1 LIMIT 1",
            self.table
        );
        let row: Option<i32> = sqlx::query_scalar(&sql)
            .bind(document_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.is_some())
    }

    async fn save_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<usize, IngestError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO {} (id, embedding, chunks, metadata) VALUES ($1, $2, $3, $4)",
            self.table
        );
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let mut inserted = 0usize;

        for chunk in chunks {
            // Savepoint per row: one bad row rolls back alone, the rest of
            // the batch still commits.
            let mut row_tx = tx.begin().await.map_err(storage)?;
            let embedding = Vector::from(chunk.embedding.clone());
            let metadata = chunk.metadata_json();
            let result = sqlx::query(&sql)
                .bind(chunk.id)
                .bind(embedding)
                .bind(&chunk.content)
                .bind(&metadata)
                .execute(&mut *row_tx)
                .await;
            match result {
                Ok(_) => {
                    row_tx.commit().await.map_err(storage)?;
                    inserted += 1;
                }
                Err(err) => {
                    warn!(
                        chunk_index = chunk.chunk_index,
                        document_number = %chunk.metadata.document_number,
                        error = %err,
                        "failed to insert chunk row; dropping it"
                    );
                    row_tx.rollback().await.map_err(storage)?;
                }
            }
        }

        tx.commit().await.map_err(storage)?;
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn storage(err: sqlx::Error) -> IngestError {
    IngestError::Storage(err.to_string())
}
