//! Demo command handler.
//!
//! Indexes one short passage about artificial intelligence in each of five
//! languages, then asks the same question in English, Spanish and Chinese.

use clap::Args;
use polyrag_core::{config::AppConfig, AppResult};
use polyrag_knowledge::{IngestOptions, QueryOptions, RagPipeline};

const SAMPLE_DOCUMENTS: [&str; 5] = [
    "Artificial intelligence (AI) is intelligence demonstrated by machines. AI research has been defined as the field of study of intelligent agents.",
    "La inteligencia artificial (IA) es la inteligencia demostrada por máquinas. Es un campo de la informática que busca crear sistemas capaces de realizar tareas que normalmente requieren inteligencia humana.",
    "L'intelligence artificielle (IA) est l'intelligence démontrée par les machines. Elle englobe la création de programmes informatiques capables de simuler certains aspects de l'intelligence humaine.",
    "Künstliche Intelligenz (KI) ist Intelligenz, die von Maschinen demonstriert wird. Sie ist ein Teilgebiet der Informatik, das sich mit der Automatisierung intelligenten Verhaltens befasst.",
    "人工智能（AI）是由机器展示的智能。人工智能研究被定义为对智能代理的研究领域，包括任何能够感知环境并采取行动以实现目标的系统。",
];

const SAMPLE_QUESTIONS: [&str; 3] = [
    "What is artificial intelligence?",
    "¿Qué es la inteligencia artificial?",
    "什么是人工智能？",
];

/// Answers longer than this are cut in the demo output.
const ANSWER_PREVIEW_CHARS: usize = 300;

/// Index a five-language sample corpus and ask cross-lingual questions
#[derive(Args, Debug)]
pub struct DemoCommand {
    /// Clear the collection before adding the sample corpus
    #[arg(long)]
    pub fresh: bool,
}

impl DemoCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing demo command");

        let pipeline = RagPipeline::from_config(config).await?;
        let result = self.run(&pipeline, config).await;
        pipeline.finish(result).await
    }

    async fn run(&self, pipeline: &RagPipeline, config: &AppConfig) -> AppResult<()> {
        let rule = "=".repeat(60);
        println!("{}", rule);
        println!("Multilingual RAG demo");
        println!("{}", rule);

        if self.fresh {
            pipeline.clear().await?;
        }

        println!();
        println!("Adding sample documents in {} languages...", SAMPLE_DOCUMENTS.len());
        let docs: Vec<String> = SAMPLE_DOCUMENTS.iter().map(|d| d.to_string()).collect();
        let options = IngestOptions::new(config.rag.chunk_size, config.rag.chunk_overlap);
        let stats = pipeline.add_documents(&docs, None, options).await?;
        println!(
            "  Added {} chunks from {} documents",
            stats.chunks_created, stats.documents_processed
        );

        println!();
        println!("{}", rule);
        println!("Cross-lingual queries");
        println!("{}", rule);

        let options = QueryOptions::default()
            .with_retrieve(config.rag.n_retrieve)
            .with_rerank(config.rag.n_rerank)
            .without_sources();

        for question in SAMPLE_QUESTIONS {
            let result = pipeline.query(question, &options).await?;
            println!();
            println!("Query: {}", question);
            println!("Detected language: {}", result.query_language);
            println!("Answer: {}", preview(&result.answer));
            println!("Confidence: {}", result.confidence);
        }

        Ok(())
    }
}

fn preview(answer: &str) -> String {
    if answer.chars().count() > ANSWER_PREVIEW_CHARS {
        let cut: String = answer.chars().take(ANSWER_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        answer.to_string()
    }
}
