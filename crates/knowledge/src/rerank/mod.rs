//! Rerankers that reorder retrieved candidates by relevance to the question.

pub mod cohere;
pub mod lexical;

pub use cohere::CohereReranker;
pub use lexical::LexicalReranker;

use crate::types::RerankedResult;
use polyrag_core::config::RerankSettings;
use polyrag_core::{AppError, AppResult};
use std::sync::Arc;

/// A reranker that scores candidate texts against a question.
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    /// Model identifier reported in pipeline stats.
    fn model_name(&self) -> &str;

    /// Return at most `min(top_n, documents.len())` results in descending
    /// relevance. Each result's `index` points into `documents`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RerankedResult>>;
}

/// Create a reranker from settings.
pub fn create_reranker(
    settings: &RerankSettings,
    endpoint: &str,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn Reranker>> {
    match settings.provider.as_str() {
        "lexical" => Ok(Arc::new(LexicalReranker::new())),
        "cohere" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("Cohere rerank provider requires an API key".to_string())
            })?;
            Ok(Arc::new(
                CohereReranker::new(key, &settings.model).with_base_url(endpoint),
            ))
        }
        _ => Err(AppError::Config(format!(
            "Unknown rerank provider: '{}'. Supported providers: cohere, lexical",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lexical() {
        let settings = RerankSettings {
            provider: "lexical".to_string(),
            ..Default::default()
        };
        let reranker = create_reranker(&settings, "", None).unwrap();
        assert_eq!(reranker.model_name(), "lexical-overlap");
    }

    #[test]
    fn test_create_cohere() {
        let reranker =
            create_reranker(&RerankSettings::default(), "https://api.cohere.com", Some("k"))
                .unwrap();
        assert_eq!(reranker.model_name(), "rerank-multilingual-v3.0");
    }

    #[test]
    fn test_cohere_requires_key() {
        let result = create_reranker(&RerankSettings::default(), "", None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
