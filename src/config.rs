//! Session configuration loaded from .sleuth/config.toml
//!
//! Everything tunable lives here: embedding model, generation model and
//! temperature, retrieval constants. The config is constructed once and passed
//! by reference - there is no process-global client state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = ".sleuth/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embeddings: EmbeddingsSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
}

// Per-field defaults so a hand-trimmed config file with only the overridden
// keys still parses.
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_generation_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_top_k() -> usize {
    5
}
fn default_confidence_weight() -> f32 {
    0.02
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsSection {
    /// Embedding model name, must exist in the builtin model table
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSection {
    /// Hosted generation model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout; a timeout is retryable
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry budget for timed-out generation calls (retries after the first
    /// attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Weight of confidence_score in the combined ranking score.
    /// Must stay small: similarity dominates ordering, confidence only breaks
    /// near-ties (records within `confidence_weight` of each other).
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f32,
    /// Optional hard confidence floor. Never applied unless set explicitly.
    #[serde(default)]
    pub min_confidence: Option<u8>,
}

impl Default for EmbeddingsSection {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            confidence_weight: default_confidence_weight(),
            min_confidence: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embeddings: EmbeddingsSection::default(),
            generation: GenerationSection::default(),
            retrieval: RetrievalSection::default(),
        }
    }
}

impl Config {
    /// Load configuration from .sleuth/config.toml, creating it with defaults
    /// on first use.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(CONFIG_PATH);

        if !config_path.exists() {
            return Self::create_default();
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config TOML")
    }

    fn create_default() -> Result<Self> {
        std::fs::create_dir_all(".sleuth")?;

        let config = Config::default();
        let content = toml::to_string_pretty(&config).context("Failed to render default config")?;
        std::fs::write(CONFIG_PATH, content)?;

        Ok(config)
    }

    /// Data directory for the database and vector index
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(".sleuth/data")
    }

    /// SQLite database path (record source of truth)
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("sleuth.db")
    }

    /// Vector index path for the configured embedding model.
    ///
    /// Indexed per model: switching models requires a rebuild, not a reload.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir()
            .join(format!("{}.usearch", self.embeddings.model))
    }

    /// Directory holding downloaded model files for the configured model
    pub fn model_dir(&self) -> PathBuf {
        PathBuf::from(".sleuth/models").join(&self.embeddings.model)
    }
}
