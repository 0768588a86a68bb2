//! Polyrag CLI
//!
//! Entry point for the polyrag command-line tool: add documents in any
//! language, then ask questions in any language.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AddCommand, ClearCommand, DeleteCommand, DemoCommand, QueryCommand, StatsCommand};
use polyrag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Polyrag - cross-lingual retrieval-augmented question answering
#[derive(Parser, Debug)]
#[command(name = "polyrag")]
#[command(about = "Cross-lingual retrieval-augmented question answering", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "POLYRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Collection to read and write
    #[arg(long, global = true, env = "POLYRAG_COLLECTION")]
    collection: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and index documents
    Add(AddCommand),

    /// Answer a question from the indexed documents
    Query(QueryCommand),

    /// Show index size and models in use
    Stats(StatsCommand),

    /// Remove every indexed chunk
    Clear(ClearCommand),

    /// Remove chunks by id
    Delete(DeleteCommand),

    /// Index a five-language sample corpus and ask cross-lingual questions
    Demo(DemoCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.collection,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Polyrag CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Collection: {}", config.rag.collection_name);

    config.ensure_polyrag_dir()?;

    let command_name = match &cli.command {
        Commands::Add(_) => "add",
        Commands::Query(_) => "query",
        Commands::Stats(_) => "stats",
        Commands::Clear(_) => "clear",
        Commands::Delete(_) => "delete",
        Commands::Demo(_) => "demo",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Add(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Demo(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
