//! Delete command handler.

use clap::Args;
use polyrag_core::{config::AppConfig, AppResult};
use polyrag_knowledge::RagPipeline;

/// Remove chunks by id
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Chunk ids, as reported by `add --json`
    #[arg(required = true)]
    pub ids: Vec<String>,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for {} id(s)", self.ids.len());

        let pipeline = RagPipeline::from_config(config).await?;
        let result = pipeline.delete_chunks(&self.ids).await;
        pipeline.finish(result).await?;

        println!("Deleted {} chunk id(s)", self.ids.len());
        Ok(())
    }
}
