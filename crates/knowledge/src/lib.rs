//! Cross-lingual retrieval-augmented generation.
//!
//! Documents are split into overlapping chunks, tagged with their language,
//! embedded with a multilingual model and stored in a vector index. Questions
//! in any language retrieve candidates, which are reranked and handed to a
//! generation model as grounding context.
//!
//! # Example
//! ```no_run
//! use polyrag_core::AppConfig;
//! use polyrag_knowledge::{IngestOptions, QueryOptions, RagPipeline};
//!
//! # async fn example() -> polyrag_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let pipeline = RagPipeline::from_config(&config).await?;
//!
//! let docs = vec!["La inteligencia artificial es la inteligencia de las máquinas.".to_string()];
//! pipeline.add_documents(&docs, None, IngestOptions::default()).await?;
//!
//! let answer = pipeline
//!     .query("What is artificial intelligence?", &QueryOptions::default())
//!     .await?;
//! println!("{} ({})", answer.answer, answer.confidence);
//! pipeline.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod lancedb_index;
pub mod language;
pub mod memory_index;
pub mod pipeline;
pub mod query;
pub mod rerank;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{CohereEmbedder, EmbeddingProvider, MockProvider};
pub use lancedb_index::LanceDbIndex;
pub use language::{DetectionError, HeuristicDetector, LanguageDetector};
pub use memory_index::InMemoryIndex;
pub use pipeline::{GenerationOptions, RagPipeline, RagPipelineBuilder};
pub use query::NO_INFORMATION_ANSWER;
pub use rerank::{CohereReranker, LexicalReranker, Reranker};
pub use types::{
    AnswerResult, ChunkMetadata, IndexHit, IndexedRecord, IngestOptions, IngestStats, Metadata,
    PipelineStats, QueryOptions, RerankedResult, RetrievedCandidate, SourceExcerpt,
};
pub use vector_index::{RecordFilter, VectorIndex};
