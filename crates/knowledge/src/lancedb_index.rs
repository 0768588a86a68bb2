//! LanceDB-backed vector index implementation.

use crate::types::{ChunkMetadata, IndexHit, IndexedRecord, Metadata};
use crate::vector_index::{cosine_distance, RecordFilter, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use polyrag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ids per delete predicate.
const DELETE_BATCH: usize = 256;

/// LanceDB-backed vector index for ingested chunks.
pub struct LanceDbIndex {
    table: Table,
    path: PathBuf,
    embedding_dim: usize,
}

impl LanceDbIndex {
    /// Create or open a LanceDB index at the specified path.
    ///
    /// # Arguments
    /// * `db_path` - Directory path for the LanceDB database
    /// * `table_name` - Collection name
    /// * `embedding_dim` - Dimension of embedding vectors (e.g., 1024)
    ///
    /// Opening an existing table with a different embedding dimension fails.
    pub async fn open(db_path: &Path, table_name: &str, embedding_dim: usize) -> AppResult<Self> {
        std::fs::create_dir_all(db_path)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == table_name) {
            let table = conn
                .open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Index(format!("Failed to open table: {}", e)))?;

            let schema = table
                .schema()
                .await
                .map_err(|e| AppError::Index(format!("Failed to read table schema: {}", e)))?;
            check_dimension(&schema, embedding_dim)?;
            table
        } else {
            let schema = Self::create_schema(embedding_dim);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                table_name,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Initialized LanceDB index '{}' at {:?}", table_name, db_path);

        Ok(Self {
            table,
            path: db_path.to_path_buf(),
            embedding_dim,
        })
    }

    /// Arrow schema for the chunks table.
    fn create_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
            Field::new("doc_index", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("language", DataType::Utf8, false),
            // Caller metadata as a JSON object
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    /// Convert records to a single columnar RecordBatch.
    fn records_to_batch(&self, records: &[IndexedRecord]) -> AppResult<RecordBatch> {
        let schema = Self::create_schema(self.embedding_dim);

        let mut flat = Vec::with_capacity(records.len() * self.embedding_dim);
        for record in records {
            if record.embedding.len() != self.embedding_dim {
                return Err(AppError::Index(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.embedding_dim,
                    record.embedding.len()
                )));
            }
            flat.extend_from_slice(&record.embedding);
        }

        let metadata_json = records
            .iter()
            .map(|r| serde_json::to_string(&r.metadata.extra))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Index(format!("Failed to serialize metadata: {}", e)))?;

        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| AppError::Index(format!("Failed to build embedding column: {}", e)))?;

        let ids = StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()));
        let texts = StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()));
        let doc_indexes =
            UInt32Array::from_iter_values(records.iter().map(|r| r.metadata.doc_index as u32));
        let chunk_indexes =
            UInt32Array::from_iter_values(records.iter().map(|r| r.metadata.chunk_index as u32));
        let languages =
            StringArray::from_iter_values(records.iter().map(|r| r.metadata.language.as_str()));
        let metadata = StringArray::from_iter_values(metadata_json.iter().map(String::as_str));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(texts),
                Arc::new(embedding_array),
                Arc::new(doc_indexes),
                Arc::new(chunk_indexes),
                Arc::new(languages),
                Arc::new(metadata),
            ],
        )
        .map_err(|e| AppError::Index(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Convert one result row to a hit, scoring it against `query`.
    fn row_to_hit(batch: &RecordBatch, row: usize, query: &[f32]) -> AppResult<IndexHit> {
        let id = string_column(batch, "id")?.value(row).to_string();
        let text = string_column(batch, "text")?.value(row).to_string();
        let language = string_column(batch, "language")?.value(row).to_string();
        let metadata_json = string_column(batch, "metadata")?.value(row);
        let doc_index = u32_column(batch, "doc_index")?.value(row) as usize;
        let chunk_index = u32_column(batch, "chunk_index")?.value(row) as usize;

        let embedding_list = batch
            .column_by_name("embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| AppError::Index("Invalid embedding column".to_string()))?;
        let values = embedding_list.value(row);
        let values = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Index("Invalid embedding values".to_string()))?;
        let embedding: Vec<f32> = values.values().to_vec();

        let extra: Metadata = serde_json::from_str(metadata_json)
            .map_err(|e| AppError::Index(format!("Failed to parse metadata: {}", e)))?;

        Ok(IndexHit {
            id,
            text,
            metadata: ChunkMetadata {
                doc_index,
                chunk_index,
                language,
                extra,
            },
            distance: cosine_distance(query, &embedding),
        })
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Index(format!("Invalid {} column", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| AppError::Index(format!("Invalid {} column", name)))
}

fn check_dimension(schema: &Schema, expected: usize) -> AppResult<()> {
    let field = schema
        .field_with_name("embedding")
        .map_err(|_| AppError::Index("Table has no embedding column".to_string()))?;

    match field.data_type() {
        DataType::FixedSizeList(_, size) if *size as usize == expected => Ok(()),
        DataType::FixedSizeList(_, size) => Err(AppError::Config(format!(
            "Index was built with {}-dimensional embeddings, but the embedding provider produces {}",
            size, expected
        ))),
        other => Err(AppError::Index(format!(
            "Unexpected embedding column type: {:?}",
            other
        ))),
    }
}

fn id_predicate(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect();
    format!("id IN ({})", quoted.join(", "))
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn name(&self) -> &str {
        "lancedb"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn add(&self, records: &[IndexedRecord]) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let batch = self.records_to_batch(records)?;
        let schema = batch.schema();

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to add records: {}", e)))?;

        tracing::debug!("Inserted {} records into LanceDB", records.len());
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&RecordFilter>,
    ) -> AppResult<Vec<IndexHit>> {
        if embedding.len() != self.embedding_dim {
            return Err(AppError::Index(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                embedding.len()
            )));
        }

        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .table
            .query()
            .nearest_to(embedding.to_vec())
            .map_err(|e| AppError::Index(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(k);

        if let Some(predicate) = filter.and_then(RecordFilter::to_predicate) {
            query = query.only_if(predicate);
        }

        let batches = query
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to execute search: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Index(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                hits.push(Self::row_to_hit(batch, row, embedding)?);
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        tracing::debug!("Retrieved {} hits (requested top-{})", hits.len(), k);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> AppResult<()> {
        for batch in ids.chunks(DELETE_BATCH) {
            self.table
                .delete(&id_predicate(batch))
                .await
                .map_err(|e| AppError::Index(format!("Failed to delete records: {}", e)))?;
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Index(format!("Failed to count rows: {}", e)))
    }

    async fn clear(&self) -> AppResult<()> {
        if self.count().await? > 0 {
            // Delete all rows with a predicate that matches everything
            self.table
                .delete("id IS NOT NULL")
                .await
                .map_err(|e| AppError::Index(format!("Failed to clear index: {}", e)))?;
        }

        tracing::info!("Cleared LanceDB index at {:?}", self.path);
        Ok(())
    }
}
