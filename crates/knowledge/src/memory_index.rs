//! In-memory vector index using cosine distance.
//!
//! Records are kept in insertion order behind a `tokio::sync::RwLock`, so ties
//! in distance resolve to the earlier record.

use crate::types::{IndexHit, IndexedRecord};
use crate::vector_index::{cosine_distance, RecordFilter, VectorIndex};
use polyrag_core::{AppError, AppResult};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Volatile vector index for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<IndexedRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    fn location(&self) -> String {
        ":memory:".to_string()
    }

    async fn add(&self, records: &[IndexedRecord]) -> AppResult<()> {
        let mut stored = self.records.write().await;

        let existing: HashSet<&str> = stored.iter().map(|r| r.id.as_str()).collect();
        if let Some(duplicate) = records.iter().find(|r| existing.contains(r.id.as_str())) {
            return Err(AppError::Index(format!(
                "Record id already exists: {}",
                duplicate.id
            )));
        }

        stored.extend(records.iter().cloned());
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&RecordFilter>,
    ) -> AppResult<Vec<IndexHit>> {
        let stored = self.records.read().await;

        let mut hits: Vec<IndexHit> = stored
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| IndexHit {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(embedding, &r.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> AppResult<()> {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.records
            .write()
            .await
            .retain(|r| !ids.contains(r.id.as_str()));
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> AppResult<()> {
        self.records.write().await.clear();
        Ok(())
    }
}
