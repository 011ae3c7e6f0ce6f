//! Entry operation: wire the production components together for one run.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::error;
use url::Url;

use crate::chunking::TokenChunker;
use crate::config::{RunParams, Settings};
use crate::embeddings::{DEFAULT_EMBEDDING_MODEL, OpenAiEmbeddingProvider};
use crate::extract::TextExtractor;
use crate::pipeline::{IngestionOrchestrator, RunSummary};
use crate::source::{FEDERAL_REGISTER_API_BASE, SourceClient};
use crate::stores::{KnowledgeStore, PgKnowledgeStore};
use crate::types::IngestError;

const USER_AGENT: &str = concat!("regsmith/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Coarse result reported to the invoking trigger.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub status_code: u16,
    pub body: String,
}

/// Runs one ingestion pass with the production defaults.
///
/// The `event`/`context` pair comes from the external trigger and is ignored.
pub async fn handle(event: serde_json::Value, context: serde_json::Value) -> RunResponse {
    let _ = (event, context);

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return RunResponse {
                status_code: 500,
                body: "invalid configuration".to_string(),
            };
        }
    };
    run_with_settings(&settings, &RunParams::default()).await
}

/// Runs one ingestion pass with explicit settings and parameters.
///
/// The store connection is opened here and closed exactly once, on the
/// success and the failure branch alike.
pub async fn run_with_settings(settings: &Settings, params: &RunParams) -> RunResponse {
    let store = match PgKnowledgeStore::connect(&settings.database).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(error = %err, "database connection failed");
            return RunResponse {
                status_code: 500,
                body: "database connection failed".to_string(),
            };
        }
    };

    let result = ingest(settings, params, store.clone()).await;
    store.close().await;

    match result {
        Ok(summary) => RunResponse {
            status_code: 200,
            body: format!(
                "embedded and saved {} documents",
                summary.persisted_documents
            ),
        },
        Err(err) => {
            error!(error = %err, "ingestion run failed");
            RunResponse {
                status_code: 500,
                body: "ingestion run failed".to_string(),
            }
        }
    }
}

async fn ingest(
    settings: &Settings,
    params: &RunParams,
    store: Arc<dyn KnowledgeStore>,
) -> Result<RunSummary, IngestError> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .use_rustls_tls()
        .build()?;

    let base_url = Url::parse(FEDERAL_REGISTER_API_BASE)
        .map_err(|err| IngestError::Config(err.to_string()))?;
    let source = SourceClient::new(client.clone(), base_url.clone());
    let extractor = TextExtractor::new(client.clone(), base_url);
    let chunker = TokenChunker::for_model(DEFAULT_EMBEDDING_MODEL)?;
    let embedder = Arc::new(OpenAiEmbeddingProvider::new(
        client,
        settings.openai_api_key.clone(),
    )?);

    let orchestrator =
        IngestionOrchestrator::new(source, extractor, chunker, embedder, store, params.pause);
    orchestrator.run(&params.fetch_query()).await
}
