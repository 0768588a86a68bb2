//! Offline embedding provider based on hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use polyrag_core::AppResult;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Deterministic, content-dependent embeddings for tests and offline use.
///
/// Each word contributes its padded character trigrams and the word itself to
/// hashed dimensions; the result is normalised to a unit vector. Texts that
/// share vocabulary end up close, in any script. There is no cross-lingual
/// semantics.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimensions: usize,
    batch_size: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            batch_size: 96,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn bucket(&self, token: &str, seed: u64) -> usize {
        let hash = token
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, usize> = HashMap::new();
        for word in lower.unicode_words() {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();

            for trigram in padded.windows(3) {
                let trigram: String = trigram.iter().collect();
                embedding[self.bucket(&trigram, 7)] += (*freq as f32).sqrt();
            }

            embedding[self.bucket(word, 17)] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
