//! Cohere embedding provider.
//!
//! Calls the v1 embed endpoint. Documents are embedded with
//! `input_type = "search_document"` and questions with `"search_query"`, which
//! is what makes cross-lingual retrieval work with the multilingual models.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use polyrag_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_COHERE_URL: &str = "https://api.cohere.com";
const EMBED_ENDPOINT: &str = "/v1/embed";

/// Texts accepted per embed request by the Cohere API.
pub const COHERE_MAX_BATCH: usize = 96;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Embedding input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    SearchDocument,
    SearchQuery,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: InputType,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Cohere embedding provider.
#[derive(Debug, Clone)]
pub struct CohereEmbedder {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl CohereEmbedder {
    /// Create an embedder for `model` against the public Cohere API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client: Arc::new(client),
            api_key: api_key.into(),
            base_url: DEFAULT_COHERE_URL.to_string(),
            model: model.into(),
            dimensions,
            batch_size: COHERE_MAX_BATCH,
        }
    }

    /// Point the embedder at another base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lower the per-request batch size. Values above the API limit are capped.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, COHERE_MAX_BATCH);
        self
    }

    fn request_body<'a>(&'a self, texts: &'a [String], input_type: InputType) -> EmbedRequest<'a> {
        EmbedRequest {
            texts,
            model: &self.model,
            input_type,
        }
    }

    /// Embed one request's worth of texts.
    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_request(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(texts, input_type))
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Cohere: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.message)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Cohere embed error ({}): {}",
                status, message
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Cohere response: {}", e)))?;

        check_embeddings(&body.embeddings, texts.len(), self.dimensions)?;

        debug!("Received {} embeddings", body.embeddings.len());
        Ok(body.embeddings)
    }
}

/// Validate count and dimension of a batch of returned vectors.
fn check_embeddings(embeddings: &[Vec<f32>], expected: usize, dimensions: usize) -> AppResult<()> {
    if embeddings.len() != expected {
        return Err(AppError::Embedding(format!(
            "Cohere returned {} embeddings for {} texts",
            embeddings.len(),
            expected
        )));
    }

    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            bad.len(),
            dimensions
        )));
    }

    Ok(())
}

#[async_trait]
impl EmbeddingProvider for CohereEmbedder {
    fn provider_name(&self) -> &str {
        "cohere"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    #[instrument(skip(self, texts), fields(texts = texts.len(), provider = "cohere"))]
    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_request(batch, InputType::SearchDocument).await?);
        }
        Ok(embeddings)
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "cohere"))]
    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut embeddings = self
            .embed_request(&[text.to_string()], InputType::SearchQuery)
            .await?;
        embeddings
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}
