//! Postgres/pgvector knowledge-store integration tests.
//!
//! These tests require a running PostgreSQL instance with the pgvector
//! extension available. Point them at your test database, e.g.:
//!
//! ```bash
//! export REGSMITH_POSTGRES_TEST_HOST=localhost
//! export REGSMITH_POSTGRES_TEST_DB=regsmith_test
//! export REGSMITH_POSTGRES_TEST_USER=postgres
//! export REGSMITH_POSTGRES_TEST_PASSWORD=postgres
//! cargo test --test postgres_store -- --ignored
//! ```
//!
//! Each test creates its own uniquely named table and drops it afterwards.

use chrono::NaiveDate;
use uuid::Uuid;

use regsmith::config::DatabaseConfig;
use regsmith::source::{Agency, Document};
use regsmith::stores::{ChunkRecord, KnowledgeStore, PgKnowledgeStore};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn test_config() -> DatabaseConfig {
    DatabaseConfig {
        host: env_or("REGSMITH_POSTGRES_TEST_HOST", "localhost"),
        port: env_or("REGSMITH_POSTGRES_TEST_PORT", "5432")
            .parse()
            .expect("valid test port"),
        name: env_or("REGSMITH_POSTGRES_TEST_DB", "regsmith_test"),
        user: env_or("REGSMITH_POSTGRES_TEST_USER", "postgres"),
        password: env_or("REGSMITH_POSTGRES_TEST_PASSWORD", "postgres"),
        table: format!("regsmith_test_{}", Uuid::new_v4().simple()),
    }
}

async fn connect_or_fail(config: &DatabaseConfig) -> PgKnowledgeStore {
    PgKnowledgeStore::connect(config).await.unwrap_or_else(|err| {
        panic!(
            "failed to connect to Postgres at {}:{}/{}: {err}\n\
             start one with: docker run -p 5432:5432 -e POSTGRES_PASSWORD=postgres pgvector/pgvector:pg16",
            config.host, config.port, config.name
        )
    })
}

fn document() -> Document {
    Document {
        document_number: "2025-01234".to_string(),
        title: "Steel Import Rule".to_string(),
        publication_date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
        html_url: "https://www.federalregister.gov/d/2025-01234".to_string(),
        full_text_xml_url: None,
        agencies: vec![Agency {
            name: "Commerce Department".to_string(),
        }],
    }
}

fn record(chunk_index: usize, dimensions: usize) -> ChunkRecord {
    ChunkRecord::from_document_chunk(
        &document(),
        chunk_index,
        format!("chunk {chunk_index}"),
        vec![0.25; dimensions],
    )
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance with pgvector"]
async fn exists_gate_flips_after_save() {
    let config = test_config();
    let store = connect_or_fail(&config).await;
    store.ensure_table(4).await.unwrap();

    assert!(!store.exists("2025-01234").await.unwrap());

    let inserted = store
        .save_chunks(vec![record(0, 4), record(1, 4)])
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert!(store.exists("2025-01234").await.unwrap());
    assert!(!store.exists("2025-09999").await.unwrap());

    sqlx::query(&format!("DROP TABLE {}", store.table()))
        .execute(store.pool())
        .await
        .unwrap();
    store.close().await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance with pgvector"]
async fn bad_row_is_dropped_while_the_rest_commit() {
    let config = test_config();
    let store = connect_or_fail(&config).await;
    store.ensure_table(4).await.unwrap();

    // The middle record's vector has the wrong dimension and must fail alone.
    let inserted = store
        .save_chunks(vec![record(0, 4), record(1, 2), record(2, 4)])
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", store.table()))
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);

    let indices: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT (metadata ->> 'chunk_index')::bigint FROM {} ORDER BY 1",
        store.table()
    ))
    .fetch_all(store.pool())
    .await
    .unwrap();
    assert_eq!(indices, vec![0, 2]);

    sqlx::query(&format!("DROP TABLE {}", store.table()))
        .execute(store.pool())
        .await
        .unwrap();
    store.close().await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance with pgvector"]
async fn saving_no_chunks_is_a_no_op() {
    let config = test_config();
    let store = connect_or_fail(&config).await;
    store.ensure_table(4).await.unwrap();

    assert_eq!(store.save_chunks(Vec::new()).await.unwrap(), 0);

    sqlx::query(&format!("DROP TABLE {}", store.table()))
        .execute(store.pool())
        .await
        .unwrap();
    store.close().await;
}
