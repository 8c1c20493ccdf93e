//! Vector index abstraction layer.
//!
//! The pipeline talks to the remote vector database only through
//! [`VectorIndex`], so provisioning and writing can be exercised against an
//! in-memory index in tests.

mod pinecone;

pub use pinecone::PineconeClient;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{IndexDescription, IndexEntry, IndexSpec};

/// Operations the pipeline needs from a vector database.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Describe an index. Returns None if it doesn't exist.
    async fn describe_index(&self, name: &str)
    -> Result<Option<IndexDescription>, VectorStoreError>;

    /// Check whether an index exists.
    async fn has_index(&self, name: &str) -> Result<bool, VectorStoreError> {
        Ok(self.describe_index(name).await?.is_some())
    }

    /// Create a new index. Fails if it already exists.
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), VectorStoreError>;

    /// Insert or overwrite entries. Returns the number of entries written.
    async fn upsert(
        &self,
        index: &IndexDescription,
        namespace: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<usize, VectorStoreError>;
}
