//! Offline reranker based on token overlap with the question.

use super::Reranker;
use crate::types::RerankedResult;
use polyrag_core::AppResult;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Scores each document by the fraction of distinct question words it contains.
///
/// Ties keep retrieval order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

fn overlap_score(query: &HashSet<String>, document: &str) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let document = tokens(document);
    query.intersection(&document).count() as f32 / query.len() as f32
}

#[async_trait::async_trait]
impl Reranker for LexicalReranker {
    fn model_name(&self) -> &str {
        "lexical-overlap"
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> AppResult<Vec<RerankedResult>> {
        let query_tokens = tokens(query);

        let mut results: Vec<RerankedResult> = documents
            .iter()
            .enumerate()
            .map(|(index, text)| RerankedResult {
                index,
                text: text.clone(),
                relevance_score: overlap_score(&query_tokens, text),
            })
            .collect();

        // sort_by is stable, so equal scores keep their original order
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_n.min(documents.len()));

        Ok(results)
    }
}
