use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use tracing::debug;

use super::embedding::SharedEmbedder;
use super::vector_store::VectorIndex;
use crate::error::{EmbeddingError, IndexError};
use crate::models::{Chunk, IndexDescription, IndexEntry, TEXT_KEY};

pub type SharedIndex = Arc<dyn VectorIndex>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub chunks: usize,
    pub vectors_upserted: usize,
    pub batches: usize,
}

/// Embeds chunks and upserts them into an existing index.
pub struct VectorStoreWriter {
    embedder: SharedEmbedder,
    index: SharedIndex,
    namespace: String,
    batch_size: usize,
    show_progress: bool,
}

impl VectorStoreWriter {
    pub fn new(
        embedder: SharedEmbedder,
        index: SharedIndex,
        namespace: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            batch_size: batch_size.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Embed and upsert `chunks` in groups of the configured batch size.
    ///
    /// Fails on the first error. Batches already upserted stay in the index.
    pub async fn write(
        &self,
        chunks: &[Chunk],
        index: &IndexDescription,
    ) -> Result<WriteReport, IndexError> {
        let mut report = WriteReport {
            chunks: chunks.len(),
            ..Default::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let pb = self.progress_bar(chunks.len() as u64);

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;

            let entries = build_entries(batch, embeddings, index)?;
            debug!(
                batch = report.batches,
                entries = entries.len(),
                index = %index.name,
                "upserting batch"
            );

            report.vectors_upserted += self.index.upsert(index, &self.namespace, entries).await?;
            report.batches += 1;
            pb.inc(batch.len() as u64);
        }

        pb.finish_and_clear();
        Ok(report)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

fn build_entries(
    batch: &[Chunk],
    embeddings: Vec<Vec<f32>>,
    index: &IndexDescription,
) -> Result<Vec<IndexEntry>, IndexError> {
    if embeddings.len() != batch.len() {
        return Err(EmbeddingError::InvalidResponse(format!(
            "got {} embeddings for {} chunks",
            embeddings.len(),
            batch.len()
        ))
        .into());
    }

    batch
        .iter()
        .zip(embeddings)
        .map(|(chunk, values)| {
            if values.len() != index.dimension as usize {
                return Err(IndexError::DimensionMismatch {
                    index: index.name.clone(),
                    expected: index.dimension,
                    actual: values.len(),
                });
            }

            let mut metadata = chunk.metadata.clone();
            metadata.insert(
                TEXT_KEY.to_string(),
                serde_json::Value::String(chunk.content.clone()),
            );

            Ok(IndexEntry {
                id: chunk.id.clone(),
                values,
                metadata,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostingSpec, IndexSpec, Metadata, Metric};
    use crate::services::embedding::tests::HashEmbedder;
    use crate::services::vector_store::tests::MemoryIndex;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn spec(dimension: u32) -> IndexSpec {
        IndexSpec {
            name: "medical-chatbot".to_string(),
            dimension,
            metric: Metric::Cosine,
            hosting: HostingSpec {
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
            },
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                let content = format!("chunk number {i}");
                let mut metadata = Metadata::new();
                metadata.insert("source".to_string(), json!("data/guide.pdf"));
                Chunk {
                    id: Chunk::generate_id("data/guide.pdf", 0, i as u32, &content),
                    content,
                    metadata,
                    chunk_index: i as u32,
                    total_chunks: n as u32,
                    start_offset: 0,
                    end_offset: 0,
                }
            })
            .collect()
    }

    async fn describe(index: &MemoryIndex) -> IndexDescription {
        index.describe_index("medical-chatbot").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_write_batches_and_stores_text() {
        let index = Arc::new(MemoryIndex::with_index(&spec(8)));
        let embedder = Arc::new(HashEmbedder::new(8));
        let writer = VectorStoreWriter::new(embedder.clone(), index.clone(), "", 2);

        let input = chunks(5);
        let report = writer.write(&input, &describe(&index).await).await.unwrap();

        assert_eq!(report.chunks, 5);
        assert_eq!(report.vectors_upserted, 5);
        assert_eq!(report.batches, 3);
        assert_eq!(index.upsert_calls.load(Ordering::SeqCst), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);

        let stored = index.entries.lock().unwrap();
        let entry = &stored[&input[2].id];
        assert_eq!(entry.metadata["text"], json!("chunk number 2"));
        assert_eq!(entry.metadata["source"], json!("data/guide.pdf"));
        assert_eq!(entry.values.len(), 8);
    }

    #[tokio::test]
    async fn test_rewrite_overwrites_same_entries() {
        let index = Arc::new(MemoryIndex::with_index(&spec(8)));
        let writer = VectorStoreWriter::new(Arc::new(HashEmbedder::new(8)), index.clone(), "", 10);
        let description = describe(&index).await;

        writer.write(&chunks(4), &description).await.unwrap();
        writer.write(&chunks(4), &description).await.unwrap();

        assert_eq!(index.entries.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let index = Arc::new(MemoryIndex::with_index(&spec(8)));
        let writer = VectorStoreWriter::new(Arc::new(HashEmbedder::new(4)), index.clone(), "", 10);

        let err = writer
            .write(&chunks(2), &describe(&index).await)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 8,
                actual: 4,
                ..
            }
        ));
        assert_eq!(index.upsert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_input_does_nothing() {
        let index = Arc::new(MemoryIndex::with_index(&spec(8)));
        let embedder = Arc::new(HashEmbedder::new(8));
        let writer = VectorStoreWriter::new(embedder.clone(), index.clone(), "", 10);

        let report = writer.write(&[], &describe(&index).await).await.unwrap();

        assert_eq!(report, WriteReport::default());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.total_calls(), 0);
    }
}
