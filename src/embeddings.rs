//! Embedding providers: the OpenAI-compatible client and a deterministic mock.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::IngestError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Maps one text chunk to a fixed-dimension vector.
///
/// One chunk per call; a failed call is reported to the caller, which drops
/// that chunk and continues with the rest of the document.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError>;

    /// Output dimension of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
///
/// Single attempt per call, fixed client timeout, no retry — chunk-level
/// failures are the caller's policy, not this client's.
pub struct OpenAiEmbeddingProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(client: Client, api_key: String) -> Result<Self, IngestError> {
        Self::with_base_url(
            client,
            api_key,
            DEFAULT_OPENAI_API_BASE,
            DEFAULT_EMBEDDING_MODEL,
            DEFAULT_EMBEDDING_DIMENSIONS,
        )
    }

    pub fn with_base_url(
        client: Client,
        api_key: String,
        base_url: &str,
        model: &str,
        dimensions: usize,
    ) -> Result<Self, IngestError> {
        if api_key.trim().is_empty() {
            return Err(IngestError::Config(
                "embedding API key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(IngestError::Embedding(format!(
                "embedding request failed ({status}): {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| {
                IngestError::Embedding("embedding response contained no vectors".to_string())
            })?;
        if vector.len() != self.dimensions {
            return Err(IngestError::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Deterministic hash-based provider for tests and offline runs.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        Ok(hash_to_vec(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i % 64) as u32 * 8) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}
