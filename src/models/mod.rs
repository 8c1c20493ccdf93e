mod config;
mod document;
mod format;
mod index;
mod secrets;

pub use config::{
    Config, DEFAULT_DATA_DIR, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_FILE_PATTERN, DEFAULT_GATEWAY_URL, DEFAULT_INDEX_NAME, DEFAULT_PINECONE_URL,
    EmbeddingConfig, EmbeddingProvider, GatewayConfig, IngestConfig, OutputConfig,
    PineconeConfig, Pooling,
};
pub use document::{Chunk, FilteredDocument, METADATA_WHITELIST, Metadata, RawDocument, TEXT_KEY};
pub use format::OutputFormat;
pub use index::{HostingSpec, IndexDescription, IndexEntry, IndexSpec, Metric};
pub use secrets::{GATEWAY_API_BASE, GATEWAY_API_KEY, PINECONE_API_KEY, Secrets};
