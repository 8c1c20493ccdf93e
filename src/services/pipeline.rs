//! The one-shot ingestion run: load, filter, chunk, check the embedder,
//! provision the index and upsert.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::chunker::TextChunker;
use super::embedding::{DimensionCheck, SharedEmbedder, check_dimension, create_embedder};
use super::filter::filter_documents;
use super::loader::PdfLoader;
use super::provisioner::{ProvisionOutcome, READY_POLL_INTERVAL, ensure_index};
use super::vector_store::PineconeClient;
use super::writer::{SharedIndex, VectorStoreWriter};
use crate::error::{AppError, IndexError};
use crate::models::{Chunk, Config, RawDocument, Secrets};

/// Counts from the offline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestPlan {
    pub data_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub pages: usize,
    pub blank_pages: usize,
    pub documents: usize,
    pub chunks: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub documents: usize,
    pub chunks: usize,
    pub vectors_upserted: usize,
    pub batches: usize,
    pub dimension_check: DimensionCheck,
    pub index_name: String,
    pub index_dimension: u32,
    pub provision: ProvisionOutcome,
    pub duration_ms: u64,
}

/// Receives console lines as soon as a stage produces them.
pub type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

pub struct IngestPipeline {
    config: Config,
    embedder: SharedEmbedder,
    index: SharedIndex,
    show_progress: bool,
    poll_interval: Duration,
    notifier: Option<Notifier>,
}

impl IngestPipeline {
    /// Build a pipeline over explicit backends.
    pub fn new(config: Config, embedder: SharedEmbedder, index: SharedIndex) -> Self {
        Self {
            config,
            embedder,
            index,
            show_progress: false,
            poll_interval: READY_POLL_INTERVAL,
            notifier: None,
        }
    }

    /// Build the configured embedder and a Pinecone client.
    pub fn connect(config: Config, secrets: &Secrets) -> Result<Self, AppError> {
        config.validate()?;
        let embedder = create_embedder(&config.embedding, &config.gateway, secrets)?;
        let index = Arc::new(PineconeClient::new(
            &config.pinecone,
            &secrets.pinecone_api_key,
        )?);
        Ok(Self::new(config, embedder, index))
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Print the dimension check lines through `notifier` right after the
    /// check, before the index is touched.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run load, filter and chunk without touching the network.
    pub fn plan(config: &Config) -> Result<IngestPlan, AppError> {
        config.validate()?;
        let loaded = PdfLoader::from_config(&config.ingest)?.load()?;
        let chunks = split(config, loaded.documents)?;

        Ok(IngestPlan {
            data_dir: config.ingest.data_dir.clone(),
            files: loaded.files,
            pages: loaded.pages,
            blank_pages: loaded.blank_pages,
            documents: chunks.documents,
            chunks: chunks.chunks.len(),
        })
    }

    pub async fn run(&self) -> Result<IngestReport, AppError> {
        self.config.validate()?;
        let started = Instant::now();

        let loader = PdfLoader::from_config(&self.config.ingest)?;
        let loaded = loader.load()?;
        let (files, pages) = (loaded.files.len(), loaded.pages);

        let mut report = self.ingest_documents(loaded.documents).await?;
        report.files = files;
        report.pages = pages;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            files = report.files,
            chunks = report.chunks,
            vectors = report.vectors_upserted,
            index = %report.index_name,
            duration_ms = report.duration_ms,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Everything after loading: filter, chunk, check, provision and write.
    pub(crate) async fn ingest_documents(
        &self,
        documents: Vec<RawDocument>,
    ) -> Result<IngestReport, AppError> {
        let started = Instant::now();
        let split = split(&self.config, documents)?;
        info!(
            documents = split.documents,
            chunks = split.chunks.len(),
            "split documents into chunks"
        );

        let dimension_check = check_dimension(
            self.embedder.as_ref(),
            self.config.embedding.dimension as usize,
        )
        .await;
        if let Some(ref notify) = self.notifier {
            for line in dimension_check.messages() {
                notify(&line);
            }
        }
        match &dimension_check {
            DimensionCheck::Match(_) => {}
            DimensionCheck::Mismatch { detected, expected } => {
                warn!(detected, expected, "embedding dimension differs from configured dimension")
            }
            DimensionCheck::Failed(e) => warn!(error = %e, "embedding self-check failed"),
        }

        let spec = self.config.index_spec();
        let (provision, description) = ensure_index(
            self.index.as_ref(),
            &spec,
            Duration::from_secs(self.config.pinecone.ready_timeout_secs),
            self.poll_interval,
        )
        .await?;

        let writer = VectorStoreWriter::new(
            self.embedder.clone(),
            self.index.clone(),
            self.config.pinecone.namespace.clone(),
            self.config.pinecone.upsert_batch_size as usize,
        )
        .with_progress(self.show_progress);
        let written = writer.write(&split.chunks, &description).await?;

        Ok(IngestReport {
            files: 0,
            pages: 0,
            documents: split.documents,
            chunks: written.chunks,
            vectors_upserted: written.vectors_upserted,
            batches: written.batches,
            dimension_check,
            index_name: description.name,
            index_dimension: description.dimension,
            provision,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

struct Split {
    documents: usize,
    chunks: Vec<Chunk>,
}

fn split(config: &Config, documents: Vec<RawDocument>) -> Result<Split, IndexError> {
    let filtered = filter_documents(documents)?;
    let chunker = TextChunker::from_config(&config.ingest);
    Ok(Split {
        documents: filtered.len(),
        chunks: chunker.split_documents(&filtered),
    })
}
