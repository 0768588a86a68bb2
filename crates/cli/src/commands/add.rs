//! Add command handler.
//!
//! Collects documents from arguments, files and directory trees, then
//! ingests them in one call.

use clap::Args;
use polyrag_core::{config::AppConfig, AppError, AppResult};
use polyrag_knowledge::{IngestOptions, Metadata, RagPipeline};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Chunk, embed and index documents
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Document texts to add
    pub texts: Vec<String>,

    /// Files to add, one document per file
    #[arg(short, long)]
    pub file: Vec<PathBuf>,

    /// Directories to walk for documents
    #[arg(long)]
    pub path: Vec<PathBuf>,

    /// File extensions picked up by --path
    #[arg(long, default_values_t = [String::from("txt"), String::from("md")])]
    pub ext: Vec<String>,

    /// Metadata attached to every document (key=value)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub meta: Vec<(String, String)>,

    /// Maximum chunk length in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing add command");

        let (texts, metadatas) = self.collect_documents()?;
        if texts.is_empty() {
            return Err(AppError::Config(
                "No documents given; pass texts, --file or --path".to_string(),
            ));
        }

        let options = IngestOptions::new(
            self.chunk_size.unwrap_or(config.rag.chunk_size),
            self.chunk_overlap.unwrap_or(config.rag.chunk_overlap),
        );

        let pipeline = RagPipeline::from_config(config).await?;
        let stats = pipeline
            .add_documents(&texts, Some(&metadatas), options)
            .await;
        let stats = pipeline.finish(stats).await?;

        if self.json {
            super::print_json(&stats)?;
        } else {
            println!(
                "Added {} chunks from {} documents to '{}'",
                stats.chunks_created, stats.documents_processed, config.rag.collection_name
            );
        }

        Ok(())
    }

    fn collect_documents(&self) -> AppResult<(Vec<String>, Vec<Metadata>)> {
        let mut texts = Vec::new();
        let mut metadatas = Vec::new();

        for text in &self.texts {
            texts.push(text.clone());
            metadatas.push(self.base_metadata(None));
        }

        let mut files = self.file.clone();
        for root in &self.path {
            files.extend(self.walk(root)?);
        }

        for file in files {
            let text = std::fs::read_to_string(&file).map_err(|e| {
                AppError::Config(format!("Failed to read {}: {}", file.display(), e))
            })?;
            texts.push(text);
            metadatas.push(self.base_metadata(Some(&file)));
        }

        tracing::debug!("Collected {} document(s)", texts.len());
        Ok((texts, metadatas))
    }

    fn walk(&self, root: &Path) -> AppResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(AppError::Config(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && self.wants(entry.path()) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!("Found {} file(s) under {}", files.len(), root.display());
        Ok(files)
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.ext.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn base_metadata(&self, source: Option<&Path>) -> Metadata {
        let mut metadata: Metadata = self
            .meta
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        if let Some(source) = source {
            metadata.insert(
                "source".to_string(),
                Value::String(source.display().to_string()),
            );
        }
        metadata
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        add: AddCommand,
    }

    fn parse(args: &[&str]) -> AddCommand {
        let mut argv = vec!["polyrag"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).add
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("source=wiki").unwrap(),
            ("source".to_string(), "wiki".to_string())
        );
        assert_eq!(
            parse_key_value("url=a=b").unwrap(),
            ("url".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_collects_texts_and_files() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "Alpha document.").unwrap();
        std::fs::write(temp.path().join("b.md"), "Beta document.").unwrap();
        std::fs::write(temp.path().join("c.bin"), "skipped").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested/d.txt"), "Delta document.").unwrap();

        let root = temp.path().to_str().unwrap();
        let cmd = parse(&["Inline text", "--path", root, "--meta", "team=docs"]);
        let (texts, metadatas) = cmd.collect_documents().unwrap();

        assert_eq!(
            texts,
            vec!["Inline text", "Alpha document.", "Beta document.", "Delta document."]
        );
        assert_eq!(metadatas.len(), 4);
        assert!(metadatas.iter().all(|m| m["team"] == "docs"));
        assert!(!metadatas[0].contains_key("source"));
        assert!(metadatas[1]["source"].as_str().unwrap().ends_with("a.txt"));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let cmd = parse(&["--path", "/definitely/not/here"]);
        assert!(matches!(cmd.collect_documents(), Err(AppError::Config(_))));
    }
}
