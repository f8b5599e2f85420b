
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::database::DEFAULT_VECTOR_DIMENSION;

const APP_DIR_NAME: &str = "code-rag";
const WORKSPACE_DIR_NAME: &str = ".code-rag";

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 500;

/// Where the vector index lives
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Inside the indexed workspace, under `.code-rag/`
    #[default]
    Workspace,
    /// In the per-user data directory
    Global,
}

impl std::fmt::Display for StorageScope {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Workspace => write!(f, "workspace"),
            Self::Global => write!(f, "global"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage_scope: StorageScope,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingOptions,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm".to_string(),
            dimension: DEFAULT_VECTOR_DIMENSION,
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

/// Folder indexing policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexingOptions {
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
    /// Glob patterns matched against paths relative to the indexed root
    pub exclude_patterns: Vec<String>,
    /// Extensions to index, in scan order, each with a leading dot
    pub include_extensions: Vec<String>,
    /// Upper bound on files accepted per scan
    pub max_files: usize,
}

impl Default for IndexingOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_patterns: [
                "**/node_modules/**",
                "**/.git/**",
                "**/dist/**",
                "**/build/**",
                "**/out/**",
                "**/target/**",
                "**/.venv/**",
                "**/__pycache__/**",
                "**/*.min.js",
                "**/*.bundle.js",
                "**/*.map",
            ]
            .map(String::from)
            .to_vec(),
            include_extensions: [
                ".ts", ".tsx", ".js", ".jsx", ".py", ".rs", ".go", ".java", ".c", ".h", ".cpp",
                ".hpp", ".cs", ".rb", ".php", ".md",
            ]
            .map(String::from)
            .to_vec(),
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid max file size: {0} (must be greater than 0)")]
    InvalidMaxFileSize(u64),
    #[error("Invalid max files: {0} (must be greater than 0)")]
    InvalidMaxFiles(usize),
    #[error("Invalid include extension: '{0}' (must start with '.')")]
    InvalidExtension(String),
    #[error("At least one include extension is required")]
    NoIncludeExtensions,
    #[error("Invalid max chunk size: {0} (must be between 50 and 8192)")]
    InvalidMaxChunkSize(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, `<config dir>/code-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.indexing.validate()?;
        self.validate_chunking_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let size = self.chunking.max_chunk_size;
        if !(50..=8192).contains(&size) {
            return Err(ConfigError::InvalidMaxChunkSize(size));
        }
        Ok(())
    }

    /// Directory holding index data for `workspace`, according to the storage scope
    #[inline]
    pub fn storage_dir(&self, workspace: &Path) -> Result<PathBuf, ConfigError> {
        match self.storage_scope {
            StorageScope::Workspace => Ok(workspace.join(WORKSPACE_DIR_NAME)),
            StorageScope::Global => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(ConfigError::DirectoryError),
        }
    }

    /// Get the path for the vector database directory
    #[inline]
    pub fn vector_database_path(&self, workspace: &Path) -> Result<PathBuf, ConfigError> {
        Ok(self.storage_dir(workspace)?.join("vectors"))
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.embedding.ollama_url()
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl IndexingOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidMaxFileSize(self.max_file_size));
        }

        if self.max_files == 0 {
            return Err(ConfigError::InvalidMaxFiles(self.max_files));
        }

        if self.include_extensions.is_empty() {
            return Err(ConfigError::NoIncludeExtensions);
        }

        if let Some(ext) = self
            .include_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::InvalidExtension(ext.clone()));
        }

        Ok(())
    }
}
