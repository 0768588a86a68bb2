//! Vector index abstraction for ingested chunks.
//!
//! Defines a provider-agnostic trait for storing records and running
//! k-nearest-neighbour queries under cosine distance.

use crate::types::{ChunkMetadata, IndexHit, IndexedRecord};
use polyrag_core::AppResult;
use serde::{Deserialize, Serialize};

/// Metadata filter applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Keep only records whose `language` equals this code
    pub language: Option<String>,
}

impl RecordFilter {
    /// Filter on the detected chunk language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Check a record's metadata against the filter.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match &self.language {
            Some(language) => metadata.language == *language,
            None => true,
        }
    }

    /// SQL-style predicate for backends with a query language.
    pub fn to_predicate(&self) -> Option<String> {
        self.language
            .as_ref()
            .map(|language| format!("language = '{}'", language.replace('\'', "''")))
    }
}

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Adding records in one call
/// - Nearest-neighbour queries with an optional filter, ascending distance
/// - Deleting by id, counting, clearing
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name, e.g. "lancedb" or "memory".
    fn name(&self) -> &str;

    /// Where the index lives (directory path, or a label for in-memory indexes).
    fn location(&self) -> String;

    /// Add records. Either all records are written or the call fails.
    async fn add(&self, records: &[IndexedRecord]) -> AppResult<()>;

    /// Return up to `k` hits ordered by ascending cosine distance.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&RecordFilter>,
    ) -> AppResult<Vec<IndexHit>>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> AppResult<()>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<usize>;

    /// Remove every record.
    async fn clear(&self) -> AppResult<()>;

    /// Release resources held by the backend.
    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, `1 - cosine similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
