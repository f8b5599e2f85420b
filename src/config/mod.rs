// Configuration management module
// TOML settings for storage scope, embeddings, indexing and chunking

pub mod settings;

pub use settings::{
    Config, ConfigError, EmbeddingConfig, IndexingOptions, StorageScope, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_FILES,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
