//! Document ingestion: chunk, tag, embed, index.

use crate::chunker::chunk_text;
use crate::pipeline::RagPipeline;
use crate::types::{
    ChunkMetadata, IndexedRecord, IngestOptions, IngestStats, Metadata, UNKNOWN_LANGUAGE,
};
use futures::{stream, StreamExt, TryStreamExt};
use polyrag_core::{AppError, AppResult};
use std::time::Instant;

/// Characters of a chunk sampled for language detection.
const LANGUAGE_SAMPLE_CHARS: usize = 200;

/// A chunk ready for embedding.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl RagPipeline {
    /// Chunk, embed and index documents.
    ///
    /// `metadatas[i]` is the base metadata for `texts[i]`; missing entries
    /// count as empty. Chunks are written in document then chunk order with a
    /// fresh UUID each, all in one index call. Any embedding or index failure
    /// fails the whole call and nothing is written.
    pub async fn add_documents(
        &self,
        texts: &[String],
        metadatas: Option<&[Metadata]>,
        options: IngestOptions,
    ) -> AppResult<IngestStats> {
        validate_options(&options)?;

        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                tracing::warn!(
                    "Got {} metadata entries for {} documents; missing entries are empty",
                    metadatas.len(),
                    texts.len()
                );
            }
        }

        let start = Instant::now();
        let chunks = self.prepare_chunks(texts, metadatas, &options);

        if chunks.is_empty() {
            tracing::info!("No chunks produced from {} document(s)", texts.len());
            return Ok(IngestStats {
                documents_processed: texts.len(),
                chunks_created: 0,
                chunk_ids: Vec::new(),
            });
        }

        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embed_in_batches(&chunk_texts).await?;

        let records: Vec<IndexedRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedRecord {
                id: uuid::Uuid::new_v4().to_string(),
                embedding,
                text: chunk.text,
                metadata: chunk.metadata,
            })
            .collect();

        self.index.add(&records).await?;

        let chunk_ids: Vec<String> = records.into_iter().map(|r| r.id).collect();

        tracing::info!(
            "Added {} chunks from {} documents to '{}' in {:.2}s",
            chunk_ids.len(),
            texts.len(),
            self.collection_name,
            start.elapsed().as_secs_f64()
        );

        Ok(IngestStats {
            documents_processed: texts.len(),
            chunks_created: chunk_ids.len(),
            chunk_ids,
        })
    }

    /// Split every document and attach merged metadata.
    pub(crate) fn prepare_chunks(
        &self,
        texts: &[String],
        metadatas: Option<&[Metadata]>,
        options: &IngestOptions,
    ) -> Vec<PreparedChunk> {
        let mut prepared = Vec::new();

        for (doc_index, text) in texts.iter().enumerate() {
            let base = metadatas.and_then(|m| m.get(doc_index));

            for (chunk_index, chunk) in chunk_text(text, options.chunk_size, options.chunk_overlap)
                .into_iter()
                .enumerate()
            {
                let language = self.detect_language(&chunk);
                prepared.push(PreparedChunk {
                    metadata: ChunkMetadata::merged(base, doc_index, chunk_index, language),
                    text: chunk,
                });
            }
        }

        prepared
    }

    /// Detect the language of a chunk from its leading characters.
    fn detect_language(&self, chunk: &str) -> String {
        let sample: String = chunk.chars().take(LANGUAGE_SAMPLE_CHARS).collect();
        self.detector.detect(&sample).unwrap_or_else(|e| {
            tracing::debug!("Chunk language undetected ({}), using '{}'", e, UNKNOWN_LANGUAGE);
            UNKNOWN_LANGUAGE.to_string()
        })
    }

    /// Embed texts in provider-sized batches, keeping vector `i` aligned with
    /// text `i` regardless of which batch finishes first.
    async fn embed_in_batches(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let batch_size = self.embedder.max_batch_size().max(1);
        let embedder = &self.embedder;

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
            .map(|batch| async move {
                let vectors = embedder.embed_documents(batch).await?;
                if vectors.len() != batch.len() {
                    return Err(AppError::Embedding(format!(
                        "Embedding service returned {} vectors for {} texts",
                        vectors.len(),
                        batch.len()
                    )));
                }
                Ok::<_, AppError>(vectors)
            })
            .buffered(self.embed_concurrency)
            .try_collect()
            .await?;

        tracing::debug!(
            "Embedded {} texts in {} batch(es) of up to {}",
            texts.len(),
            batches.len(),
            batch_size
        );

        Ok(batches.into_iter().flatten().collect())
    }
}

fn validate_options(options: &IngestOptions) -> AppResult<()> {
    if options.chunk_size == 0 {
        return Err(AppError::Config(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if options.chunk_overlap >= options.chunk_size {
        return Err(AppError::Config(format!(
            "chunk_overlap ({}) must be less than chunk_size ({})",
            options.chunk_overlap, options.chunk_size
        )));
    }
    Ok(())
}
