//! The RAG pipeline: explicitly constructed, dependency-injected, explicitly
//! closed.
//!
//! Ingestion lives in [`crate::ingest`] and answering in [`crate::query`];
//! both extend [`RagPipeline`] with further `impl` blocks.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::lancedb_index::LanceDbIndex;
use crate::language::{HeuristicDetector, LanguageDetector};
use crate::rerank::{create_reranker, Reranker};
use crate::types::PipelineStats;
use crate::vector_index::VectorIndex;
use polyrag_core::{AppConfig, AppError, AppResult};
use polyrag_llm::{create_client, LlmClient, ProviderType};
use std::sync::Arc;

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "multilingual_rag";

/// Default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "command-r-08-2024";

/// Settings forwarded to the generation service on every answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Cross-lingual retrieval-augmented generation pipeline.
///
/// Holds shared handles to its collaborators; the only state that outlives a
/// call is what the vector index stores.
pub struct RagPipeline {
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) detector: Arc<dyn LanguageDetector>,
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) reranker: Arc<dyn Reranker>,
    pub(crate) generator: Arc<dyn LlmClient>,
    pub(crate) generation: GenerationOptions,
    pub(crate) collection_name: String,
    pub(crate) embed_concurrency: usize,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("collection_name", &self.collection_name)
            .field("index", &self.index.name())
            .field("embedding_model", &self.embedder.model_name())
            .field("rerank_model", &self.reranker.model_name())
            .field("generation", &self.generation)
            .finish()
    }
}

impl RagPipeline {
    /// Start building a pipeline.
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Build a pipeline from application configuration.
    ///
    /// Validates the configuration, resolves the API key, opens the
    /// persistent LanceDB index and creates every collaborator.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let rag = &config.rag;
        let api_key = config.resolve_api_key();

        let embedder = create_provider(&rag.embedding, &rag.cohere_endpoint, api_key.as_deref())?;
        let reranker = create_reranker(&rag.rerank, &rag.cohere_endpoint, api_key.as_deref())?;

        let generation_provider = ProviderType::parse(&rag.generation.provider).ok_or_else(|| {
            AppError::Config(format!(
                "Unknown generation provider: {}",
                rag.generation.provider
            ))
        })?;
        let generation_endpoint = match generation_provider {
            ProviderType::Cohere => Some(
                rag.generation
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| rag.cohere_endpoint.clone()),
            ),
            ProviderType::Ollama => rag.generation.endpoint.clone(),
        };
        let generator = create_client(
            generation_provider.as_str(),
            generation_endpoint.as_deref(),
            api_key.as_deref(),
        )
        .map_err(|e| AppError::Config(format!("Failed to create generation client: {}", e)))?;

        let index = LanceDbIndex::open(
            &config.index_path(),
            &rag.collection_name,
            embedder.dimensions(),
        )
        .await?;

        tracing::info!(
            collection = %rag.collection_name,
            embedding = %embedder.model_name(),
            rerank = %reranker.model_name(),
            generation = %rag.generation.model,
            "Opened RAG pipeline at {:?}",
            config.index_path()
        );

        RagPipeline::builder()
            .embedder(embedder)
            .index(Arc::new(index))
            .reranker(reranker)
            .generator(generator)
            .generation(GenerationOptions {
                model: rag.generation.model.clone(),
                temperature: rag.generation.temperature,
                max_tokens: rag.generation.max_tokens,
            })
            .collection_name(&rag.collection_name)
            .embed_concurrency(rag.embedding.concurrency)
            .build()
    }

    /// Collection name this pipeline reads and writes.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Index size and the models in use.
    pub async fn get_stats(&self) -> AppResult<PipelineStats> {
        Ok(PipelineStats {
            document_count: self.index.count().await?,
            collection_name: self.collection_name.clone(),
            persist_directory: self.index.location(),
            generation_model: self.generation.model.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            rerank_model: self.reranker.model_name().to_string(),
        })
    }

    /// Remove every indexed chunk.
    pub async fn clear(&self) -> AppResult<()> {
        self.index.clear().await?;
        tracing::info!("Cleared collection '{}'", self.collection_name);
        Ok(())
    }

    /// Remove chunks by id. Unknown ids are ignored.
    pub async fn delete_chunks(&self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.index.delete(ids).await?;
        tracing::info!(
            "Deleted {} chunk id(s) from '{}'",
            ids.len(),
            self.collection_name
        );
        Ok(())
    }

    /// Release the index. The pipeline is consumed.
    pub async fn close(self) -> AppResult<()> {
        self.index.close().await?;
        tracing::debug!("Closed RAG pipeline '{}'", self.collection_name);
        Ok(())
    }

    /// Close the pipeline after an operation and hand back its result.
    ///
    /// An operation error takes precedence over a close error; the close
    /// error is then only logged.
    pub async fn finish<T>(self, result: AppResult<T>) -> AppResult<T> {
        let closed = self.close().await;
        match (result, closed) {
            (Ok(value), closed) => closed.map(|_| value),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!("Failed to close pipeline after error: {}", close_err);
                Err(e)
            }
        }
    }
}

/// Builder for [`RagPipeline`].
///
/// Embedder, index, reranker and generator are required. The language
/// detector defaults to [`HeuristicDetector`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    index: Option<Arc<dyn VectorIndex>>,
    reranker: Option<Arc<dyn Reranker>>,
    generator: Option<Arc<dyn LlmClient>>,
    generation: Option<GenerationOptions>,
    collection_name: Option<String>,
    embed_concurrency: Option<usize>,
}

impl RagPipelineBuilder {
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn LlmClient>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Embedding batches in flight during ingestion (minimum 1).
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.embed_concurrency = Some(concurrency);
        self
    }

    /// Build the pipeline, failing with a configuration error when a required
    /// collaborator is missing.
    pub fn build(self) -> AppResult<RagPipeline> {
        let embedder = self.embedder.ok_or_else(|| missing("embedder"))?;
        let index = self.index.ok_or_else(|| missing("index"))?;
        let reranker = self.reranker.ok_or_else(|| missing("reranker"))?;
        let generator = self.generator.ok_or_else(|| missing("generator"))?;

        Ok(RagPipeline {
            embedder,
            detector: self
                .detector
                .unwrap_or_else(|| Arc::new(HeuristicDetector::new())),
            index,
            reranker,
            generator,
            generation: self.generation.unwrap_or_default(),
            collection_name: self
                .collection_name
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embed_concurrency: self.embed_concurrency.unwrap_or(1).max(1),
        })
    }
}

fn missing(part: &str) -> AppError {
    AppError::Config(format!("RAG pipeline requires a {}", part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use crate::memory_index::InMemoryIndex;
    use crate::rerank::LexicalReranker;
    use polyrag_llm::OllamaClient;

    fn builder() -> RagPipelineBuilder {
        RagPipeline::builder()
            .embedder(Arc::new(MockProvider::new(16)))
            .index(Arc::new(InMemoryIndex::new()))
            .reranker(Arc::new(LexicalReranker::new()))
            .generator(Arc::new(OllamaClient::new()))
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = builder().build().unwrap();
        assert_eq!(pipeline.collection_name(), DEFAULT_COLLECTION);
        assert_eq!(pipeline.generation.model, DEFAULT_GENERATION_MODEL);
        assert_eq!(pipeline.embed_concurrency, 1);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = RagPipeline::builder()
            .embedder(Arc::new(MockProvider::new(16)))
            .build();
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("index")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stats_report_models() {
        let pipeline = builder()
            .collection_name("papers")
            .generation(GenerationOptions {
                model: "llama3".to_string(),
                ..Default::default()
            })
            .build()
            .unwrap();

        let stats = pipeline.get_stats().await.unwrap();
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.collection_name, "papers");
        assert_eq!(stats.persist_directory, ":memory:");
        assert_eq!(stats.generation_model, "llama3");
        assert_eq!(stats.embedding_model, "trigram-v1");
        assert_eq!(stats.rerank_model, "lexical-overlap");

        pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_from_config_offline_providers() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config.rag.embedding.provider = "mock".to_string();
        config.rag.embedding.dimensions = 32;
        config.rag.rerank.provider = "lexical".to_string();
        config.rag.generation.provider = "ollama".to_string();
        config.rag.generation.model = "llama3".to_string();

        let pipeline = RagPipeline::from_config(&config).await.unwrap();
        let stats = pipeline.get_stats().await.unwrap();
        assert_eq!(stats.collection_name, "multilingual_rag");
        assert!(stats.persist_directory.ends_with("index"));
        assert_eq!(stats.embedding_model, "trigram-v1");
        pipeline.close().await.unwrap();
    }
}
