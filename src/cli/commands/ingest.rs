//! Ingest command implementation.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, Secrets};
use crate::services::IngestPipeline;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(long, short = 'd', help = "Directory containing the PDF files")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, short = 'i', help = "Name of the Pinecone index to write to")]
    pub index_name: Option<String>,

    #[arg(long, help = "Maximum chunk length in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared between consecutive chunks")]
    pub chunk_overlap: Option<u32>,

    #[arg(long, short = 'r', help = "Also load PDFs from subdirectories")]
    pub recursive: bool,

    #[arg(long, help = "Load and chunk only; report what would be upserted")]
    pub dry_run: bool,
}

impl IngestArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref dir) = self.data_dir {
            config.ingest.data_dir = dir.clone();
        }
        if let Some(ref name) = self.index_name {
            config.pinecone.index_name = name.clone();
        }
        if let Some(size) = self.chunk_size {
            config.ingest.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.ingest.chunk_overlap = overlap;
        }
        if self.recursive {
            config.ingest.recursive = true;
        }
    }
}

pub async fn handle_ingest(
    args: IngestArgs,
    mut config: Config,
    secrets: Option<Secrets>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if args.dry_run {
        let plan = IngestPipeline::plan(&config).context("dry run failed")?;
        print!("{}", formatter.format_plan(&plan));
        return Ok(());
    }

    let secrets = secrets.context("API keys were not loaded")?;
    if verbose {
        eprintln!(
            "Ingesting {} into index '{}' using {} ({})",
            config.ingest.data_dir.display(),
            config.pinecone.index_name,
            config.embedding.model,
            config.embedding.provider
        );
    }

    let mut pipeline = IngestPipeline::connect(config, &secrets)
        .context("failed to initialize embedder or Pinecone client")?
        .with_progress(format == OutputFormat::Text && std::io::stderr().is_terminal());
    if format == OutputFormat::Text {
        pipeline = pipeline.with_notifier(Arc::new(|line: &str| println!("{line}")));
    }

    let report = pipeline.run().await.context("ingestion failed")?;
    print!("{}", formatter.format_ingest_report(&report));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let args = IngestArgs {
            data_dir: Some(PathBuf::from("papers/")),
            index_name: Some("papers".to_string()),
            chunk_size: Some(800),
            chunk_overlap: None,
            recursive: true,
            dry_run: false,
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.ingest.data_dir, PathBuf::from("papers/"));
        assert_eq!(config.pinecone.index_name, "papers");
        assert_eq!(config.ingest.chunk_size, 800);
        assert_eq!(config.ingest.chunk_overlap, 20);
        assert!(config.ingest.recursive);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let args = IngestArgs {
            data_dir: None,
            index_name: None,
            chunk_size: Some(10),
            chunk_overlap: Some(10),
            recursive: false,
            dry_run: true,
        };
        let err = handle_ingest(args, Config::default(), None, OutputFormat::Text, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_secrets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("guide.pdf"),
            crate::services::minimal_pdf(&["Drink water"]),
        )
        .unwrap();

        let args = IngestArgs {
            data_dir: Some(dir.path().to_path_buf()),
            index_name: None,
            chunk_size: None,
            chunk_overlap: None,
            recursive: false,
            dry_run: true,
        };
        handle_ingest(args, Config::default(), None, OutputFormat::Json, false)
            .await
            .unwrap();
    }
}
