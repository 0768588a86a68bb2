//! Configuration management for polyrag.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.polyrag/config.yaml` or `POLYRAG_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the vector index and config file
//! live under `.polyrag/` by default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers understood by the pipeline factory.
pub const EMBEDDING_PROVIDERS: [&str; 2] = ["cohere", "mock"];

/// Reranking providers understood by the pipeline factory.
pub const RERANK_PROVIDERS: [&str; 2] = ["cohere", "lexical"];

/// Generation providers understood by the LLM factory.
pub const GENERATION_PROVIDERS: [&str; 2] = ["cohere", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .polyrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Pipeline and collaborator settings
    pub rag: RagSettings,
}

/// Pipeline settings from the `rag` section of config.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Vector index collection (table) name
    pub collection_name: String,

    /// Where the vector index is persisted, relative to the workspace unless absolute
    pub persist_directory: PathBuf,

    /// Environment variable holding the Cohere API key
    pub api_key_env: String,

    /// Base URL of the Cohere API
    pub cohere_endpoint: String,

    pub embedding: EmbeddingSettings,

    pub rerank: RerankSettings,

    pub generation: GenerationSettings,

    /// Default chunk size in characters
    pub chunk_size: usize,

    /// Default overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Default number of candidates retrieved from the index
    pub n_retrieve: usize,

    /// Default number of candidates kept after reranking
    pub n_rerank: usize,
}

/// Embedding service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// "cohere" or "mock"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Maximum texts per embedding request
    pub batch_size: usize,
    /// Embedding batches in flight at once during ingestion
    pub concurrency: usize,
}

/// Reranker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RerankSettings {
    /// "cohere" or "lexical"
    pub provider: String,
    pub model: String,
}

/// Text generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// "cohere" or "ollama"
    pub provider: String,
    pub model: String,
    /// Custom endpoint (Ollama URL, or a Cohere-compatible proxy)
    pub endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            collection_name: "multilingual_rag".to_string(),
            persist_directory: PathBuf::from(".polyrag/index"),
            api_key_env: "COHERE_API_KEY".to_string(),
            cohere_endpoint: "https://api.cohere.com".to_string(),
            embedding: EmbeddingSettings::default(),
            rerank: RerankSettings::default(),
            generation: GenerationSettings::default(),
            chunk_size: 500,
            chunk_overlap: 50,
            n_retrieve: 10,
            n_rerank: 5,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "cohere".to_string(),
            model: "embed-multilingual-v3.0".to_string(),
            dimensions: 1024,
            batch_size: 96,
            concurrency: 1,
        }
    }
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            provider: "cohere".to_string(),
            model: "rerank-multilingual-v3.0".to_string(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "cohere".to_string(),
            model: "command-r-08-2024".to_string(),
            endpoint: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl RagSettings {
    /// Whether any configured collaborator talks to the Cohere API.
    pub fn uses_cohere(&self) -> bool {
        self.embedding.provider == "cohere"
            || self.rerank.provider == "cohere"
            || self.generation.provider == "cohere"
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    rag: Option<RagSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and environment variables.
    ///
    /// Environment variables:
    /// - `POLYRAG_WORKSPACE`: Override workspace path
    /// - `POLYRAG_CONFIG`: Path to config file
    /// - `POLYRAG_COLLECTION`: Collection name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use polyrag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("POLYRAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("POLYRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.polyrag_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(collection) = std::env::var("POLYRAG_COLLECTION") {
            config.rag.collection_name = collection;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        collection: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(collection) = collection {
            self.rag.collection_name = collection;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .polyrag directory.
    pub fn polyrag_dir(&self) -> PathBuf {
        self.workspace.join(".polyrag")
    }

    /// Ensure the .polyrag directory exists.
    pub fn ensure_polyrag_dir(&self) -> AppResult<()> {
        let dir = self.polyrag_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .polyrag directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved location of the persistent vector index.
    pub fn index_path(&self) -> PathBuf {
        if self.rag.persist_directory.is_absolute() {
            self.rag.persist_directory.clone()
        } else {
            self.workspace.join(&self.rag.persist_directory)
        }
    }

    /// Read the Cohere API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.rag.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Like [`resolve_api_key`](Self::resolve_api_key), but a missing key is a
    /// configuration error.
    pub fn require_api_key(&self) -> AppResult<String> {
        self.resolve_api_key().ok_or_else(|| {
            AppError::Config(format!(
                "{} is required (set it in the environment)",
                self.rag.api_key_env
            ))
        })
    }

    /// Validate provider names, chunking defaults, and credentials.
    pub fn validate(&self) -> AppResult<()> {
        let rag = &self.rag;

        check_provider("embedding", &rag.embedding.provider, &EMBEDDING_PROVIDERS)?;
        check_provider("rerank", &rag.rerank.provider, &RERANK_PROVIDERS)?;
        check_provider("generation", &rag.generation.provider, &GENERATION_PROVIDERS)?;

        if rag.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be greater than zero".to_string()));
        }

        if rag.chunk_overlap >= rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be less than chunkSize ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }

        if rag.embedding.batch_size == 0 || rag.embedding.concurrency == 0 {
            return Err(AppError::Config(
                "embedding batchSize and concurrency must be greater than zero".to_string(),
            ));
        }

        if rag.uses_cohere() {
            self.require_api_key()?;
        }

        Ok(())
    }
}

fn check_provider(kind: &str, provider: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&provider) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {} provider: {}. Supported: {}",
            kind,
            provider,
            known.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.rag.embedding.provider = "mock".to_string();
        config.rag.rerank.provider = "lexical".to_string();
        config.rag.generation.provider = "ollama".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rag.collection_name, "multilingual_rag");
        assert_eq!(config.rag.embedding.model, "embed-multilingual-v3.0");
        assert_eq!(config.rag.embedding.batch_size, 96);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert!(!config.verbose);
    }

    #[test]
    fn test_index_path_is_workspace_relative() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/tmp/ws");
        assert_eq!(config.index_path(), PathBuf::from("/tmp/ws/.polyrag/index"));

        config.rag.persist_directory = PathBuf::from("/var/lib/polyrag");
        assert_eq!(config.index_path(), PathBuf::from("/var/lib/polyrag"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            Some("papers".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.rag.collection_name, "papers");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = offline_config();
        config.rag.rerank.provider = "jina".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown rerank provider"));
    }

    #[test]
    fn test_validate_offline_providers_need_no_key() {
        assert!(offline_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_api_key_for_cohere() {
        let mut config = offline_config();
        config.rag.embedding.provider = "cohere".to_string();
        config.rag.api_key_env = "POLYRAG_TEST_UNSET_KEY_7431".to_string();

        match config.validate() {
            Err(AppError::Config(msg)) => assert!(msg.contains("POLYRAG_TEST_UNSET_KEY_7431")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        let mut config = offline_config();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml_rag_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "rag:\n  collectionName: notes\n  chunkSize: 800\n  embedding:\n    provider: mock\n    dimensions: 384\nlogging:\n  level: warn\n  color: false\n",
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.rag.collection_name, "notes");
        assert_eq!(merged.rag.chunk_size, 800);
        // Unspecified keys keep their defaults
        assert_eq!(merged.rag.chunk_overlap, 50);
        assert_eq!(merged.rag.embedding.provider, "mock");
        assert_eq!(merged.rag.embedding.dimensions, 384);
        assert_eq!(merged.rag.embedding.batch_size, 96);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
    }
}
