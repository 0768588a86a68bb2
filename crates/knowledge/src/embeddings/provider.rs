//! Embedding provider trait and factory.

use polyrag_core::config::EmbeddingSettings;
use polyrag_core::{AppError, AppResult};
use std::sync::Arc;

use super::providers::{CohereEmbedder, MockProvider};

/// Trait for embedding providers.
///
/// `embed_documents` must return exactly one vector per input text, in input
/// order.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "cohere", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Largest number of texts accepted by a single `embed_documents` call.
    fn max_batch_size(&self) -> usize;

    /// Embed texts for storage.
    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a question for retrieval.
    ///
    /// Providers without a distinct query mode embed the text as a document.
    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_documents(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings.
///
/// `endpoint` is the Cohere API base URL; `api_key` is required for Cohere.
pub fn create_provider(
    settings: &EmbeddingSettings,
    endpoint: &str,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(
            MockProvider::new(settings.dimensions).with_batch_size(settings.batch_size),
        )),

        "cohere" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("Cohere embedding provider requires an API key".to_string())
            })?;
            Ok(Arc::new(
                CohereEmbedder::new(key, &settings.model, settings.dimensions)
                    .with_base_url(endpoint)
                    .with_batch_size(settings.batch_size),
            ))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: cohere, mock",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            provider: "mock".to_string(),
            dimensions: 64,
            batch_size: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&mock_settings(), "http://unused", None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.dimensions(), 64);
        assert_eq!(provider.max_batch_size(), 8);
    }

    #[test]
    fn test_create_cohere_provider() {
        let settings = EmbeddingSettings::default();
        let provider =
            create_provider(&settings, "https://api.cohere.com", Some("test-key")).unwrap();
        assert_eq!(provider.provider_name(), "cohere");
        assert_eq!(provider.model_name(), "embed-multilingual-v3.0");
        assert_eq!(provider.dimensions(), 1024);
        assert_eq!(provider.max_batch_size(), 96);
    }

    #[test]
    fn test_cohere_requires_api_key() {
        let result = create_provider(&EmbeddingSettings::default(), "https://api.cohere.com", None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_create_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "word2vec".to_string(),
            ..Default::default()
        };
        let err = create_provider(&settings, "", None).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_default_embed_query() {
        let provider = create_provider(&mock_settings(), "", None).unwrap();
        let embedding = provider.embed_query("hola mundo").await.unwrap();
        assert_eq!(embedding.len(), 64);
    }
}
