use super::fakes::{
    sample_corpus, strings, FailingDetector, HarnessBuilder, RecordingEmbedder,
    RecordingGenerator, ScriptedReranker,
};
use crate::memory_index::InMemoryIndex;
use crate::pipeline::{GenerationOptions, RagPipeline};
use crate::query::{ANSWER_PREAMBLE, CONTEXT_SEPARATOR, NO_INFORMATION_ANSWER};
use crate::types::{IngestOptions, QueryOptions};
use crate::vector_index::VectorIndex;
use polyrag_core::AppError;
use std::sync::Arc;

const QUESTION: &str = "What is artificial intelligence?";

#[tokio::test]
async fn test_empty_index_returns_no_information() {
    let harness = HarnessBuilder::new().build();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert_eq!(answer.query_language, "en");
    assert_eq!(answer.confidence, 0.0);
    assert_eq!(answer.sources, Some(Vec::new()));
    assert!(harness.reranker.calls().is_empty());
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn test_question_is_embedded_once_as_query() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    let queries = harness.embedder.queries.lock().unwrap().clone();
    assert_eq!(queries, vec![QUESTION.to_string()]);
}

#[tokio::test]
async fn test_confidence_is_rounded_mean_of_rerank_scores() {
    let harness = HarnessBuilder::new().scores(vec![0.9, 0.7, 0.5]).build();
    let docs = sample_corpus()[..3].to_vec();
    harness
        .pipeline
        .add_documents(&docs, None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_rerank(3))
        .await
        .unwrap();

    assert_eq!(answer.answer, "Generated answer.");
    assert_eq!(answer.confidence, 0.7);

    let scores: Vec<f64> = answer.sources.unwrap().iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![0.9, 0.7, 0.5]);
}

#[tokio::test]
async fn test_rerank_limit_is_capped_by_candidates() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_rerank(10))
        .await
        .unwrap();

    let calls = harness.reranker.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query, QUESTION);
    assert_eq!(calls[0].documents.len(), 5);
    assert_eq!(calls[0].top_n, 5);
    assert_eq!(answer.sources.unwrap().len(), 5);
}

#[tokio::test]
async fn test_retrieve_limit_bounds_candidates() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_retrieve(3))
        .await
        .unwrap();

    let calls = harness.reranker.calls();
    assert_eq!(calls[0].documents.len(), 3);
    assert_eq!(calls[0].top_n, 3);
    assert_eq!(answer.sources.unwrap().len(), 3);
}

#[tokio::test]
async fn test_generation_receives_reranked_context() {
    // Second candidate scores highest, so it leads the context
    let harness = HarnessBuilder::new().scores(vec![0.2, 0.9]).build();
    harness
        .pipeline
        .add_documents(&sample_corpus()[..2], None, IngestOptions::default())
        .await
        .unwrap();

    harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    let retrieved = harness.reranker.calls()[0].documents.clone();
    let requests = harness.generator.requests();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    let expected_context = format!("{}{}{}", retrieved[1], CONTEXT_SEPARATOR, retrieved[0]);
    assert_eq!(
        request.prompt,
        format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer based on the context above:",
            expected_context, QUESTION
        )
    );
    assert_eq!(request.system.as_deref(), Some(ANSWER_PREAMBLE));
    assert_eq!(request.model, "command-r-08-2024");
}

#[tokio::test]
async fn test_generation_options_are_forwarded() {
    let generator = Arc::new(RecordingGenerator::new("ok"));
    let pipeline = RagPipeline::builder()
        .embedder(Arc::new(RecordingEmbedder::new(96)))
        .index(Arc::new(InMemoryIndex::new()))
        .reranker(Arc::new(ScriptedReranker::new(vec![0.5])))
        .generator(generator.clone())
        .generation(GenerationOptions {
            model: "command-r-plus".to_string(),
            temperature: Some(0.3),
            max_tokens: Some(256),
        })
        .build()
        .unwrap();

    pipeline
        .add_documents(&sample_corpus()[..1], None, IngestOptions::default())
        .await
        .unwrap();
    pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    let request = &generator.requests()[0];
    assert_eq!(request.model, "command-r-plus");
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.max_tokens, Some(256));
}

#[tokio::test]
async fn test_sources_are_truncated_and_tagged() {
    let harness = HarnessBuilder::new().build();
    let long = "The passage is about retrieval systems. ".repeat(8);
    let docs = vec![long, sample_corpus()[1].clone()];
    harness
        .pipeline
        .add_documents(&docs, None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    let sources = answer.sources.unwrap();
    assert_eq!(sources.len(), 2);

    let long_source = sources
        .iter()
        .find(|s| s.text.starts_with("The passage"))
        .unwrap();
    assert_eq!(long_source.text.chars().count(), 203);
    assert!(long_source.text.ends_with("..."));
    assert_eq!(long_source.language, "en");

    let spanish = sources
        .iter()
        .find(|s| s.text.starts_with("La inteligencia"))
        .unwrap();
    assert_eq!(spanish.language, "es");
    assert_eq!(spanish.text.chars().count(), 203);
}

#[tokio::test]
async fn test_sources_can_be_omitted() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().without_sources())
        .await
        .unwrap();

    assert!(answer.sources.is_none());
    assert!(answer.confidence > 0.0);
}

#[tokio::test]
async fn test_language_filter_restricts_candidates() {
    let harness = HarnessBuilder::new().build();
    let corpus = sample_corpus();
    harness
        .pipeline
        .add_documents(&corpus, None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_language("es"))
        .await
        .unwrap();

    let calls = harness.reranker.calls();
    assert_eq!(calls[0].documents, vec![corpus[1].clone()]);
    let sources = answer.sources.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].language, "es");
}

#[tokio::test]
async fn test_unmatched_language_filter_returns_no_information() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_language("ja"))
        .await
        .unwrap();

    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn test_query_language_is_detected() {
    let harness = HarnessBuilder::new().build();

    let cases = [
        ("¿Qué es la inteligencia artificial?", "es"),
        ("什么是人工智能？", "zh"),
        (QUESTION, "en"),
    ];
    for (question, expected) in cases {
        let answer = harness
            .pipeline
            .query(question, &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(answer.query_language, expected, "question: {}", question);
    }
}

#[tokio::test]
async fn test_undetected_query_language_is_unknown() {
    let harness = HarnessBuilder::new()
        .detector(Arc::new(FailingDetector))
        .build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(answer.query_language, "unknown");
    assert_eq!(answer.answer, "Generated answer.");
}

#[tokio::test]
async fn test_out_of_range_rerank_index_fails() {
    let harness = HarnessBuilder::new().bad_rerank_index(42).build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let result = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await;

    assert!(matches!(result, Err(AppError::Rerank(_))));
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn test_zero_rerank_returns_no_information() {
    let harness = HarnessBuilder::new().build();
    harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default().with_rerank(0))
        .await
        .unwrap();

    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert_eq!(answer.confidence, 0.0);
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn test_delete_and_clear() {
    let harness = HarnessBuilder::new().build();
    let stats = harness
        .pipeline
        .add_documents(&sample_corpus(), None, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(harness.pipeline.get_stats().await.unwrap().document_count, 5);

    harness
        .pipeline
        .delete_chunks(&stats.chunk_ids[..2])
        .await
        .unwrap();
    harness
        .pipeline
        .delete_chunks(&strings(&["not-a-real-id"]))
        .await
        .unwrap();
    assert_eq!(harness.index.count().await.unwrap(), 3);

    harness.pipeline.clear().await.unwrap();
    let stats = harness.pipeline.get_stats().await.unwrap();
    assert_eq!(stats.document_count, 0);
    assert_eq!(stats.embedding_model, "recording-embed");
    assert_eq!(stats.rerank_model, "scripted-rerank");

    let answer = harness
        .pipeline
        .query(QUESTION, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
}
