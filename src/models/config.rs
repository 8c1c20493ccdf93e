use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::format::OutputFormat;
use super::index::{HostingSpec, IndexSpec, Metric};
use crate::error::ConfigError;

pub const DEFAULT_DATA_DIR: &str = "data/";
pub const DEFAULT_FILE_PATTERN: &str = "*.pdf";
pub const DEFAULT_GATEWAY_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_PINECONE_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_PINECONE_API_VERSION: &str = "2024-07";
pub const DEFAULT_INDEX_NAME: &str = "medical-chatbot";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub pinecone: PineconeConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pdfingest").join("config.toml"))
    }

    /// Load from an explicit path, or from the user config directory if a
    /// file exists there, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.embedding.dimension == 0 || self.pinecone.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension and pinecone.dimension must be greater than zero".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 || self.pinecone.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch sizes must be greater than zero".to_string(),
            ));
        }
        if self.pinecone.index_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pinecone.index_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Descriptor of the index this configuration provisions.
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.pinecone.index_name.clone(),
            dimension: self.pinecone.dimension,
            metric: self.pinecone.metric,
            hosting: HostingSpec {
                cloud: self.pinecone.cloud.clone(),
                region: self.pinecone.region.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_file_pattern")]
    pub pattern: String,

    #[serde(default)]
    pub recursive: bool,

    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_file_pattern() -> String {
    DEFAULT_FILE_PATTERN.to_string()
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_overlap() -> u32 {
    20
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pattern: default_file_pattern(),
            recursive: false,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// ONNX sentence-transformer loaded in-process
    #[default]
    Local,
    /// OpenAI-compatible embeddings endpoint behind the gateway
    Gateway,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Local => write!(f, "local"),
            EmbeddingProvider::Gateway => write!(f, "gateway"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Attention-masked mean of the token embeddings
    #[default]
    Mean,
    /// Embedding of the last non-padding token
    LastToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Directory holding `model.onnx` and `tokenizer.json` for the local provider.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Dimension the embedder is expected to produce. A self-check warns
    /// when the model disagrees; the index is sized by `pinecone.dimension`.
    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub pooling: Pooling,

    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("pdfingest").join("models").join("all-MiniLM-L6-v2"))
        .unwrap_or_else(|| PathBuf::from("models/all-MiniLM-L6-v2"))
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    256
}

fn default_embedding_batch_size() -> u32 {
    32
}

fn default_timeout() -> u64 {
    120
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            model_dir: default_model_dir(),
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            pooling: Pooling::default(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL exported as `OPENAI_API_BASE` and used by the gateway embedder.
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default = "default_pinecone_url")]
    pub controller_url: String,

    #[serde(default = "default_pinecone_api_version")]
    pub api_version: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: u32,

    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,

    #[serde(default = "default_pinecone_timeout")]
    pub timeout_secs: u64,
}

fn default_pinecone_url() -> String {
    DEFAULT_PINECONE_URL.to_string()
}

fn default_pinecone_api_version() -> String {
    DEFAULT_PINECONE_API_VERSION.to_string()
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_upsert_batch_size() -> u32 {
    100
}

fn default_ready_timeout() -> u64 {
    300
}

fn default_pinecone_timeout() -> u64 {
    60
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            controller_url: default_pinecone_url(),
            api_version: default_pinecone_api_version(),
            index_name: default_index_name(),
            dimension: default_dimension(),
            metric: Metric::default(),
            cloud: default_cloud(),
            region: default_region(),
            namespace: String::new(),
            upsert_batch_size: default_upsert_batch_size(),
            ready_timeout_secs: default_ready_timeout(),
            timeout_secs: default_pinecone_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}
