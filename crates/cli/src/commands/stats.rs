//! Stats command handler.

use clap::Args;
use polyrag_core::{config::AppConfig, AppResult};
use polyrag_knowledge::RagPipeline;

/// Show index size and models in use
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let pipeline = RagPipeline::from_config(config).await?;
        let stats = pipeline.get_stats().await;
        let stats = pipeline.finish(stats).await?;

        if self.json {
            super::print_json(&stats)?;
        } else {
            println!("Collection:       {}", stats.collection_name);
            println!("Chunks:           {}", stats.document_count);
            println!("Persist dir:      {}", stats.persist_directory);
            println!("Embedding model:  {}", stats.embedding_model);
            println!("Rerank model:     {}", stats.rerank_model);
            println!("Generation model: {}", stats.generation_model);
        }

        Ok(())
    }
}
