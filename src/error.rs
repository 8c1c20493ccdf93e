//! Error types for the ingestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to configuration and required secrets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} not found. {hint}")]
    MissingSecret { name: &'static str, hint: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("failed to load model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),

    #[error("failed to connect to embedding gateway: {0}")]
    ConnectionError(String),

    #[error("embedding gateway error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

/// Errors related to the remote vector database.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector database: {0}")]
    ConnectionError(String),

    #[error("index error: {0}")]
    IndexError(String),

    #[error("index '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("index '{name}' not ready after {waited_secs}s")]
    NotReady { name: String, waited_secs: u64 },

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid response from vector database: {0}")]
    InvalidResponse(String),
}

/// Errors raised while loading, chunking or writing documents.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("input directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("file read error: {path}: {message}")]
    FileReadError { path: PathBuf, message: String },

    #[error("failed to parse PDF {path}: {message}")]
    PdfParse { path: PathBuf, message: String },

    #[error("no files matching '{pattern}' found in {dir}")]
    NoFilesFound { dir: PathBuf, pattern: String },

    #[error("no extractable text in {dir} ({pages} pages read); scanned PDFs need OCR first")]
    NoTextExtracted { dir: PathBuf, pages: usize },

    #[error("document has no content (source: {source_path})")]
    EmptyContent { source_path: String },

    #[error("invalid file pattern: {0}")]
    InvalidPattern(String),

    #[error(
        "embedding dimension {actual} does not match index '{index}' dimension {expected}; \
         recreate the index or change the embedding model"
    )]
    DimensionMismatch {
        index: String,
        expected: u32,
        actual: usize,
    },

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_message_names_variable() {
        let err = ConfigError::MissingSecret {
            name: "PINECONE_API_KEY",
            hint: "Add it to your .env".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "PINECONE_API_KEY not found. Add it to your .env"
        );
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = IndexError::DimensionMismatch {
            index: "medical-chatbot".to_string(),
            expected: 384,
            actual: 768,
        };
        let msg = err.to_string();
        assert!(msg.contains("768"));
        assert!(msg.contains("384"));
        assert!(msg.contains("medical-chatbot"));
    }

    #[test]
    fn test_app_error_wraps_domain_errors() {
        let err: AppError = IndexError::DirectoryNotFound(PathBuf::from("data/")).into();
        assert!(err.to_string().contains("data/"));
    }
}
