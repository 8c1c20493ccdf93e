mod chunker;
pub mod embedding;
mod filter;
mod loader;
mod pipeline;
mod provisioner;
pub mod vector_store;
mod writer;

pub use chunker::TextChunker;
pub use embedding::{
    DimensionCheck, Embedder, GatewayEmbedder, OnnxEmbedder, SELF_CHECK_TEXT, SharedEmbedder,
    check_dimension, create_embedder,
};
pub use filter::{filter_documents, filter_to_minimal};
pub use loader::{LoadedDocuments, PdfLoader};
pub use pipeline::{IngestPipeline, IngestPlan, IngestReport, Notifier};
pub use provisioner::{ProvisionOutcome, READY_POLL_INTERVAL, ensure_index};
pub use vector_store::{PineconeClient, VectorIndex};
pub use writer::{SharedIndex, VectorStoreWriter, WriteReport};

#[cfg(test)]
pub(crate) use loader::tests::minimal_pdf;
