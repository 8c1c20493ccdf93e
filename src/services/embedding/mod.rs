//! Text embedding backends.
//!
//! One embedder instance is built at startup and shared by the dimension
//! check and the vector store writer.

mod gateway;
mod onnx;

pub use gateway::GatewayEmbedder;
pub use onnx::OnnxEmbedder;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingProvider, GatewayConfig, Secrets};

/// Text used to detect the embedder's output dimension.
pub const SELF_CHECK_TEXT: &str = "hello world";

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    /// Human-readable model identifier.
    fn model_name(&self) -> &str;
}

pub type SharedEmbedder = Arc<dyn Embedder>;

/// Build the configured embedder.
pub fn create_embedder(
    config: &EmbeddingConfig,
    gateway: &GatewayConfig,
    secrets: &Secrets,
) -> Result<SharedEmbedder, EmbeddingError> {
    match config.provider {
        EmbeddingProvider::Local => Ok(Arc::new(OnnxEmbedder::load(config)?)),
        EmbeddingProvider::Gateway => Ok(Arc::new(GatewayEmbedder::new(
            config,
            gateway,
            &secrets.gateway_api_key,
        )?)),
    }
}

/// Outcome of the embedding self-check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionCheck {
    Match(usize),
    Mismatch { detected: usize, expected: usize },
    Failed(String),
}

impl DimensionCheck {
    pub fn detected(&self) -> Option<usize> {
        match self {
            DimensionCheck::Match(n) => Some(*n),
            DimensionCheck::Mismatch { detected, .. } => Some(*detected),
            DimensionCheck::Failed(_) => None,
        }
    }

    /// Console lines reporting the outcome.
    pub fn messages(&self) -> Vec<String> {
        match self {
            DimensionCheck::Match(n) => vec![format!("Embedding dimension detected: {n}")],
            DimensionCheck::Mismatch { detected, expected } => vec![
                format!("Embedding dimension detected: {detected}"),
                format!(
                    "Warning: embedding dimension != {expected}. \
                     Adjust Pinecone index dimension accordingly."
                ),
            ],
            DimensionCheck::Failed(e) => {
                vec![format!("Could not auto-check embedding dimension: {e}")]
            }
        }
    }
}

/// Embed [`SELF_CHECK_TEXT`] and compare its length with `expected`. Never fails:
/// errors are reported as [`DimensionCheck::Failed`].
pub async fn check_dimension(embedder: &dyn Embedder, expected: usize) -> DimensionCheck {
    match embedder.embed_query(SELF_CHECK_TEXT).await {
        Ok(vector) if vector.len() == expected => DimensionCheck::Match(vector.len()),
        Ok(vector) => DimensionCheck::Mismatch {
            detected: vector.len(),
            expected,
        },
        Err(e) => DimensionCheck::Failed(e.to_string()),
    }
}

/// Scale `v` to unit length.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
