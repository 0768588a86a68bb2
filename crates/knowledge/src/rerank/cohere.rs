//! Cohere rerank provider (v1 rerank endpoint).

use super::Reranker;
use crate::types::RerankedResult;
use polyrag_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_COHERE_URL: &str = "https://api.cohere.com";
const RERANK_ENDPOINT: &str = "/v1/rerank";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
    return_documents: bool,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    relevance_score: f32,
}

/// Cohere reranker.
#[derive(Debug, Clone)]
pub struct CohereReranker {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CohereReranker {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_COHERE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Attach texts to the returned hits, rejecting indexes outside `documents`.
fn to_results(hits: Vec<RerankHit>, documents: &[String]) -> AppResult<Vec<RerankedResult>> {
    let mut results = hits
        .into_iter()
        .map(|hit| {
            let text = documents.get(hit.index).ok_or_else(|| {
                AppError::Rerank(format!(
                    "Cohere returned index {} for {} documents",
                    hit.index,
                    documents.len()
                ))
            })?;
            Ok(RerankedResult {
                index: hit.index,
                text: text.clone(),
                relevance_score: hit.relevance_score,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(results)
}

#[async_trait::async_trait]
impl Reranker for CohereReranker {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, query, documents), fields(documents = documents.len(), model = %self.model))]
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RerankedResult>> {
        let top_n = top_n.min(documents.len());
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
            return_documents: false,
        };

        let url = format!("{}{}", self.base_url, RERANK_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to send request to Cohere: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Rerank(format!(
                "Cohere rerank error ({}): {}",
                status, error_text
            )));
        }

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to parse Cohere response: {}", e)))?;

        debug!("Reranked {} documents into {} results", documents.len(), body.results.len());
        to_results(body.results, documents)
    }
}
