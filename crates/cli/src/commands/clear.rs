//! Clear command handler.

use clap::Args;
use polyrag_core::{config::AppConfig, AppError, AppResult};
use polyrag_knowledge::RagPipeline;

/// Remove every indexed chunk
#[derive(Args, Debug)]
pub struct ClearCommand {
    /// Skip the confirmation requirement
    #[arg(short, long)]
    pub yes: bool,
}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        if !self.yes {
            return Err(AppError::Config(format!(
                "Refusing to clear '{}' without --yes",
                config.rag.collection_name
            )));
        }

        let pipeline = RagPipeline::from_config(config).await?;
        let result = pipeline.clear().await;
        pipeline.finish(result).await?;

        println!("Cleared collection '{}'", config.rag.collection_name);
        Ok(())
    }
}
