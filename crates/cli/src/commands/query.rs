//! Query command handler.

use clap::Args;
use polyrag_core::{config::AppConfig, AppResult};
use polyrag_knowledge::{AnswerResult, QueryOptions, RagPipeline};

/// Answer a question from the indexed documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Question, in any language
    pub question: String,

    /// Candidates fetched from the vector index
    #[arg(long)]
    pub n_retrieve: Option<usize>,

    /// Candidates kept after reranking
    #[arg(long)]
    pub n_rerank: Option<usize>,

    /// Only retrieve chunks tagged with this language code
    #[arg(long)]
    pub language: Option<String>,

    /// Omit source excerpts
    #[arg(long)]
    pub no_sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");

        let options = self.options(config);
        tracing::debug!("Query options: {:?}", options);

        let pipeline = RagPipeline::from_config(config).await?;
        let result = pipeline.query(&self.question, &options).await;
        let result = pipeline.finish(result).await?;

        if self.json {
            super::print_json(&result)?;
        } else {
            print_answer(&result);
        }

        Ok(())
    }

    fn options(&self, config: &AppConfig) -> QueryOptions {
        let mut options = QueryOptions::default()
            .with_retrieve(self.n_retrieve.unwrap_or(config.rag.n_retrieve))
            .with_rerank(self.n_rerank.unwrap_or(config.rag.n_rerank));
        if let Some(language) = &self.language {
            options = options.with_language(language.as_str());
        }
        if self.no_sources {
            options = options.without_sources();
        }
        options
    }
}

pub(crate) fn print_answer(result: &AnswerResult) {
    println!("Answer:");
    println!("{}", result.answer);
    println!();
    println!(
        "Language: {}  Confidence: {:.3}",
        result.query_language, result.confidence
    );

    if let Some(sources) = &result.sources {
        if !sources.is_empty() {
            println!();
            println!("Sources:");
            for (i, source) in sources.iter().enumerate() {
                println!(
                    "  [{}] ({}, {:.3}) {}",
                    i + 1,
                    source.language,
                    source.score,
                    source.text.replace('\n', " ")
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        query: QueryCommand,
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let mut config = AppConfig::default();
        config.rag.n_retrieve = 20;
        config.rag.n_rerank = 4;

        let cmd = TestCli::parse_from(["polyrag", "¿Qué es?"]).query;
        let options = cmd.options(&config);
        assert_eq!(options.n_retrieve, 20);
        assert_eq!(options.n_rerank, 4);
        assert!(options.language_filter.is_none());
        assert!(options.include_sources);
    }

    #[test]
    fn test_flags_override_config() {
        let cmd = TestCli::parse_from([
            "polyrag",
            "What is AI?",
            "--n-retrieve",
            "3",
            "--n-rerank",
            "2",
            "--language",
            "es",
            "--no-sources",
        ])
        .query;

        let options = cmd.options(&AppConfig::default());
        assert_eq!(options.n_retrieve, 3);
        assert_eq!(options.n_rerank, 2);
        assert_eq!(options.language_filter.as_deref(), Some("es"));
        assert!(!options.include_sources);
    }
}
