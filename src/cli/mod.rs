//! CLI module for the PDF ingestion tool.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Load a directory of PDFs, embed their text and store it in a Pinecone index.
#[derive(Debug, Parser)]
#[command(name = "pdfingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "PDFINGEST_CONFIG",
        help = "Path to a config file (defaults to the user config directory)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load, chunk and embed the PDFs and upsert them into the index
    Ingest(commands::IngestArgs),

    /// Check secrets and the state of the target index
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

impl Commands {
    /// Whether the command talks to the embedding gateway or Pinecone and so
    /// needs both API keys.
    pub fn needs_secrets(&self) -> bool {
        matches!(self, Commands::Ingest(args) if !args.dry_run)
    }
}
