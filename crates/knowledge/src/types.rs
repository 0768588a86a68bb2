//! Core types for ingestion, retrieval and answering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open key/value metadata supplied by callers alongside a document.
pub type Metadata = Map<String, Value>;

/// Language code used when detection fails or a record carries none.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

fn unknown_language() -> String {
    UNKNOWN_LANGUAGE.to_string()
}

/// Metadata stored with every ingested chunk.
///
/// `doc_index`, `chunk_index` and `language` are reserved: they are always
/// present and win over caller keys of the same name. Every other caller key
/// is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Position of the source document in the ingest call
    #[serde(default)]
    pub doc_index: usize,

    /// Position of the chunk within its document
    #[serde(default)]
    pub chunk_index: usize,

    /// Detected language code, or "unknown"
    #[serde(default = "unknown_language")]
    pub language: String,

    /// Caller-supplied metadata
    #[serde(flatten)]
    pub extra: Metadata,
}

impl ChunkMetadata {
    /// Keys owned by the ingestion pipeline.
    pub const RESERVED_KEYS: [&'static str; 3] = ["doc_index", "chunk_index", "language"];

    /// Merge the reserved fields on top of the caller's base metadata.
    pub fn merged(
        base: Option<&Metadata>,
        doc_index: usize,
        chunk_index: usize,
        language: impl Into<String>,
    ) -> Self {
        let mut extra = base.cloned().unwrap_or_default();
        for key in Self::RESERVED_KEYS {
            extra.remove(key);
        }

        Self {
            doc_index,
            chunk_index,
            language: language.into(),
            extra,
        }
    }

}

/// Options for adding documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl IngestOptions {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

/// Result of an ingest call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents_processed: usize,
    pub chunks_created: usize,
    /// Ids of the written records, in document then chunk order
    pub chunk_ids: Vec<String>,
}

/// Options for answering a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Candidates fetched from the vector index
    pub n_retrieve: usize,

    /// Candidates kept after reranking
    pub n_rerank: usize,

    /// Restrict retrieval to chunks tagged with this language
    pub language_filter: Option<String>,

    /// Attach source excerpts to the answer
    pub include_sources: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            n_retrieve: 10,
            n_rerank: 5,
            language_filter: None,
            include_sources: true,
        }
    }
}

impl QueryOptions {
    pub fn with_retrieve(mut self, n_retrieve: usize) -> Self {
        self.n_retrieve = n_retrieve;
        self
    }

    pub fn with_rerank(mut self, n_rerank: usize) -> Self {
        self.n_rerank = n_rerank;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_filter = Some(language.into());
        self
    }

    pub fn without_sources(mut self) -> Self {
        self.include_sources = false;
        self
    }
}

/// A record as written to the vector index. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour hit returned by a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query, ascending across hits
    pub distance: f32,
}

/// A retrieved chunk with its similarity to the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// `1 - cosine distance`
    pub score: f32,
}

impl From<IndexHit> for RetrievedCandidate {
    fn from(hit: IndexHit) -> Self {
        Self {
            id: hit.id,
            text: hit.text,
            metadata: hit.metadata,
            score: 1.0 - hit.distance,
        }
    }
}

/// One reranked candidate, pointing back into the candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedResult {
    /// Index into the candidate texts given to the reranker
    pub index: usize,
    pub text: String,
    pub relevance_score: f32,
}

/// A source excerpt attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    /// At most 200 characters, followed by "..." when truncated
    pub text: String,
    /// Relevance score rounded to 3 decimals
    pub score: f64,
    pub language: String,
}

/// Answer produced by the query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub query_language: String,
    /// Mean relevance of the reranked results, rounded to 3 decimals
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceExcerpt>>,
}

/// Pipeline statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Number of indexed chunks
    pub document_count: usize,
    pub collection_name: String,
    pub persist_directory: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub rerank_model: String,
}
