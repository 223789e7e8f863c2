//! Configuration management for the Yatri travel assistant.
//!
//! Configuration is assembled from, in increasing precedence:
//! - Built-in defaults
//! - The workspace config file (`.yatri/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The result is handed to the RAG engine once at construction time and is
//! never mutated while queries are in flight.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .yatri/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Persona definition id under `.yatri/prompts/`; built-in persona when unset
    pub persona: Option<String>,

    pub retrieval: RetrievalSettings,
    pub context: ContextSettings,
    pub generation: GenerationSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub health: HealthSettings,
}

/// Which metadata identifies "the same evidence" during deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupKey {
    /// Same location and category collapse to the best-scoring chunk
    #[default]
    LocationCategory,
    /// Same source reference (or chunk id when absent) collapses
    Source,
    /// Keep every hit
    None,
}

/// Retriever settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Nearest neighbours requested from the index
    pub top_k: usize,

    /// Minimum cosine similarity (0.0 - 1.0)
    pub similarity_threshold: f32,

    /// Deduplication policy
    pub dedup_key: DedupKey,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.3,
            dedup_key: DedupKey::LocationCategory,
        }
    }
}

/// Context assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextSettings {
    /// Token budget for the assembled context block
    pub budget_tokens: usize,

    /// Upper bound on chunks included regardless of budget
    pub max_chunks: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            budget_tokens: 1000,
            max_chunks: 5,
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Backend provider ("ollama")
    pub provider: String,

    /// Backend base URL
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum generated tokens
    pub max_tokens: u32,

    /// Timeout for the generation call
    pub timeout_secs: u64,

    /// Timeout for each health probe attempt
    pub probe_timeout_secs: u64,

    /// Extra probe attempts after the first failure
    pub probe_retries: u32,

    /// Pause between probe attempts
    pub probe_backoff_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:1.5b".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
            probe_timeout_secs: 5,
            probe_retries: 1,
            probe_backoff_ms: 250,
        }
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_backoff(&self) -> Duration {
        Duration::from_millis(self.probe_backoff_ms)
    }
}

/// Query embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "hashing"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider base URL
    pub endpoint: String,

    /// Timeout for a single embedding request
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Exact search over the JSON export of the ingestion pipeline
    #[default]
    Memory,
    /// Read-only LanceDB table
    LanceDb,
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSettings {
    pub backend: IndexBackend,

    /// JSON export file (memory) or database directory (lancedb).
    /// Relative paths resolve against the workspace.
    pub path: PathBuf,

    /// LanceDB table name
    pub table: String,

    /// Timeout for a single index query
    pub timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            path: PathBuf::from(".yatri/index/tourism_embeddings.json"),
            table: "tourism_chunks".to_string(),
            timeout_secs: 10,
        }
    }
}

impl IndexSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Health reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthSettings {
    /// How long a computed health report may be reused; 0 disables caching
    pub cache_ttl_secs: u64,
}

impl HealthSettings {
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    persona: Option<String>,
    retrieval: Option<RetrievalSettings>,
    context: Option<ContextSettings>,
    generation: Option<GenerationSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexSettings>,
    health: Option<HealthSettings>,
    logging: Option<LoggingConfig>,
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
            persona: None,
            retrieval: RetrievalSettings::default(),
            context: ContextSettings::default(),
            generation: GenerationSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            health: HealthSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and
    /// environment variables.
    ///
    /// Environment variables:
    /// - `YATRI_WORKSPACE`: Override workspace path
    /// - `YATRI_CONFIG`: Path to config file
    /// - `YATRI_MODEL`: Generation model identifier
    /// - `YATRI_OLLAMA_URL`: Base URL for both generation and embeddings
    /// - `YATRI_INDEX_PATH`: Vector index location
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use yatri_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, preferring explicitly supplied workspace and
    /// config file paths over their environment variables.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("YATRI_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("YATRI_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.yatri_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(model) = std::env::var("YATRI_MODEL") {
            config.generation.model = model;
        }

        if let Ok(url) = std::env::var("YATRI_OLLAMA_URL") {
            config.generation.endpoint = url.clone();
            config.embedding.endpoint = url;
        }

        if let Some(path) = env_path("YATRI_INDEX_PATH") {
            config.index.path = path;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(persona) = file.persona {
            result.persona = Some(persona);
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(context) = file.context {
            result.context = context;
        }
        if let Some(generation) = file.generation {
            result.generation = generation;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(index) = file.index {
            result.index = index;
        }
        if let Some(health) = file.health {
            result.health = health;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged configuration from {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(model) = model {
            self.generation.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .yatri directory.
    pub fn yatri_dir(&self) -> PathBuf {
        self.workspace.join(".yatri")
    }

    /// Resolve the vector index location against the workspace.
    pub fn index_path(&self) -> PathBuf {
        if self.index.path.is_absolute() {
            self.index.path.clone()
        } else {
            self.workspace.join(&self.index.path)
        }
    }

    /// Validate the configuration before an engine is built from it.
    pub fn validate(&self) -> AppResult<()> {
        let retrieval = &self.retrieval;
        if retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&retrieval.similarity_threshold) {
            return Err(AppError::Config(format!(
                "retrieval.similarityThreshold must be within [0, 1], got {}",
                retrieval.similarity_threshold
            )));
        }

        if self.context.budget_tokens == 0 {
            return Err(AppError::Config(
                "context.budgetTokens must be at least 1".to_string(),
            ));
        }
        if self.context.max_chunks == 0 {
            return Err(AppError::Config(
                "context.maxChunks must be at least 1".to_string(),
            ));
        }

        let generation = &self.generation;
        let known_generation = ["ollama"];
        if !known_generation.contains(&generation.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                generation.provider,
                known_generation.join(", ")
            )));
        }
        if generation.model.trim().is_empty() {
            return Err(AppError::Config("generation.model cannot be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(AppError::Config(format!(
                "generation.temperature must be within [0, 2], got {}",
                generation.temperature
            )));
        }
        if generation.timeout_secs == 0 || generation.probe_timeout_secs == 0 {
            return Err(AppError::Config(
                "generation timeouts must be positive".to_string(),
            ));
        }

        let known_embedding = ["ollama", "hashing"];
        if !known_embedding.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedding.join(", ")
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if self.embedding.timeout_secs == 0 || self.index.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding and index timeouts must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}
