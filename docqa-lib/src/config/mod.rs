//! Configuration loading and validation
//!
//! Settings live in `config.toml` under the platform config directory
//! (`~/.config/docqa/config.toml` on Linux). Every section and key is
//! optional; missing values take the defaults below.
//!
//! ```toml
//! [chunking]
//! size = 500
//! overlap = 50
//!
//! [retrieval]
//! top_k = 3
//!
//! [generation]
//! base_url = "https://api.groq.com/openai/v1/"
//! model = "llama-3.3-70b-versatile"
//! temperature = 0.2
//! max_tokens = 1500
//! timeout_secs = 60
//! ```


use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, WordWindowChunker};
use crate::retrieve::DEFAULT_TOP_K;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk
    pub size: usize,
    /// Words shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks passed to the answer composer per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenAI-compatible API root; `chat/completions` is appended
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Falls back to the `GROQ_API_KEY` environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 1500,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be greater than 0)")]
    InvalidTopK(usize),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid max_tokens: {0} (must be greater than 0)")]
    InvalidMaxTokens(u32),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("Configuration directory not found")]
    DirectoryError,
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::InvalidConfiguration(err.to_string())
    }
}

impl Config {
    /// Platform config directory for docqa.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("docqa"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, or defaults if there is none.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> crate::Result<Self> {
        Self::load_file(config_dir.as_ref().join(CONFIG_FILE))
    }

    /// Load a specific TOML file, or defaults if it does not exist.
    pub fn load_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        self.generation.validate()?;
        Ok(())
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.size));
        }
        if self.overlap >= self.size {
            return Err(ConfigError::OverlapTooLarge(self.overlap, self.size));
        }
        Ok(())
    }

    /// The chunker these settings describe.
    pub fn chunker(&self) -> crate::Result<WordWindowChunker> {
        WordWindowChunker::new(self.size, self.overlap)
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }
        self.endpoint()?;
        Ok(())
    }

    /// Full URL of the chat completions endpoint.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        let url = Url::parse(&base)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} (must use http or https)",
                self.base_url
            )));
        }

        url.join("chat/completions")
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.base_url)))
    }

    /// The configured API key, else the `GROQ_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
