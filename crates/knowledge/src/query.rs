//! Question answering: detect, retrieve, rerank, generate, score.

use crate::pipeline::RagPipeline;
use crate::types::{
    AnswerResult, QueryOptions, RerankedResult, RetrievedCandidate, SourceExcerpt,
    UNKNOWN_LANGUAGE,
};
use crate::vector_index::RecordFilter;
use polyrag_core::{AppError, AppResult};
use polyrag_llm::LlmRequest;
use tracing::Instrument;

/// Answer returned when nothing relevant is indexed.
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have enough information to answer this question.";

/// Instructions sent with every generation request.
pub const ANSWER_PREAMBLE: &str = "You are a helpful multilingual assistant.
Answer questions based ONLY on the provided context.
If the context doesn't contain enough information, say so.
Always respond in the same language as the question.
Be concise but thorough.";

/// Separator between context passages.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Longest source excerpt, in characters, before "..." is appended.
const EXCERPT_CHARS: usize = 200;

impl RagPipeline {
    /// Answer a question from the indexed chunks.
    ///
    /// Steps run strictly in order: detect the question's language, embed and
    /// retrieve `n_retrieve` candidates, rerank to `n_rerank`, then generate
    /// once from the reranked context. With no candidates the fixed
    /// no-information answer is returned without reranking or generating.
    pub async fn query(&self, question: &str, options: &QueryOptions) -> AppResult<AnswerResult> {
        let span = tracing::info_span!(
            "query",
            n_retrieve = options.n_retrieve,
            n_rerank = options.n_rerank,
            language_filter = options.language_filter.as_deref().unwrap_or("")
        );
        self.answer(question, options).instrument(span).await
    }

    async fn answer(&self, question: &str, options: &QueryOptions) -> AppResult<AnswerResult> {
        let query_language = self.detector.detect(question).unwrap_or_else(|e| {
            tracing::debug!("Question language undetected ({})", e);
            UNKNOWN_LANGUAGE.to_string()
        });

        let filter = options
            .language_filter
            .as_ref()
            .map(|language| RecordFilter::default().with_language(language.as_str()));

        let embedding = self.embedder.embed_query(question).await?;
        let candidates: Vec<RetrievedCandidate> = self
            .index
            .query(&embedding, options.n_retrieve, filter.as_ref())
            .await?
            .into_iter()
            .map(RetrievedCandidate::from)
            .collect();

        tracing::debug!(
            "Retrieved {} candidates (language: {})",
            candidates.len(),
            query_language
        );

        if candidates.is_empty() {
            tracing::info!("No candidates retrieved; returning no-information answer");
            return Ok(no_information(query_language));
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let top_n = options.n_rerank.min(candidates.len());
        let mut reranked = self.reranker.rerank(question, &documents, top_n).await?;

        if let Some(bad) = reranked.iter().find(|r| r.index >= candidates.len()) {
            return Err(AppError::Rerank(format!(
                "Reranker returned index {} for {} candidates",
                bad.index,
                candidates.len()
            )));
        }
        reranked.truncate(top_n);

        if reranked.is_empty() {
            tracing::info!("Reranking kept no candidates; returning no-information answer");
            return Ok(no_information(query_language));
        }

        let request = self.generation_request(question, &reranked);
        let response = self.generator.complete(&request).await?;

        let confidence = mean_relevance(&reranked);
        tracing::info!(
            "Answered with {} sources (confidence {:.3})",
            reranked.len(),
            confidence
        );

        let sources = options.include_sources.then(|| {
            reranked
                .iter()
                .map(|r| SourceExcerpt {
                    text: truncate_excerpt(&r.text),
                    score: round3(r.relevance_score as f64),
                    language: source_language(&candidates[r.index]),
                })
                .collect()
        });

        Ok(AnswerResult {
            answer: response.content,
            query_language,
            confidence,
            sources,
        })
    }

    fn generation_request(&self, question: &str, reranked: &[RerankedResult]) -> LlmRequest {
        let context = build_context(reranked);
        let prompt = format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer based on the context above:",
            context, question
        );

        let mut request =
            LlmRequest::new(prompt, self.generation.model.as_str()).with_system(ANSWER_PREAMBLE);
        if let Some(temperature) = self.generation.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.generation.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

fn no_information(query_language: String) -> AnswerResult {
    AnswerResult {
        answer: NO_INFORMATION_ANSWER.to_string(),
        query_language,
        confidence: 0.0,
        sources: Some(Vec::new()),
    }
}

/// Join reranked passages, most relevant first.
pub fn build_context(reranked: &[RerankedResult]) -> String {
    reranked
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Mean relevance score rounded to 3 decimals; 0.0 for no results.
pub fn mean_relevance(reranked: &[RerankedResult]) -> f64 {
    if reranked.is_empty() {
        return 0.0;
    }
    let sum: f64 = reranked.iter().map(|r| r.relevance_score as f64).sum();
    round3(sum / reranked.len() as f64)
}

/// Round to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Keep the first 200 characters, appending "..." when text was cut.
pub fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() > EXCERPT_CHARS {
        let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        excerpt.push_str("...");
        excerpt
    } else {
        text.to_string()
    }
}

fn source_language(candidate: &RetrievedCandidate) -> String {
    if candidate.metadata.language.is_empty() {
        UNKNOWN_LANGUAGE.to_string()
    } else {
        candidate.metadata.language.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, text: &str, score: f32) -> RerankedResult {
        RerankedResult {
            index,
            text: text.to_string(),
            relevance_score: score,
        }
    }

    #[test]
    fn test_build_context_keeps_order() {
        let reranked = vec![result(2, "best", 0.9), result(0, "second", 0.4)];
        assert_eq!(build_context(&reranked), "best\n\n---\n\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_mean_relevance_rounds() {
        let reranked = vec![result(0, "a", 0.9), result(1, "b", 0.7), result(2, "c", 0.5)];
        assert_eq!(mean_relevance(&reranked), 0.7);

        let reranked = vec![result(0, "a", 0.12345), result(1, "b", 0.0)];
        assert_eq!(mean_relevance(&reranked), 0.062);
        assert_eq!(mean_relevance(&[]), 0.0);
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short"), "short");

        let exact = "x".repeat(200);
        assert_eq!(truncate_excerpt(&exact), exact);

        let long = "é".repeat(250);
        let excerpt = truncate_excerpt(&long);
        assert_eq!(excerpt.chars().count(), 203);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.12349), 0.123);
        assert_eq!(round3(0.9f32 as f64), 0.9);
    }
}
