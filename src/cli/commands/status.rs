use std::path::PathBuf;

use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, GATEWAY_API_KEY, OutputFormat, PINECONE_API_KEY};
use crate::services::{PineconeClient, VectorIndex};

fn env_present(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

pub async fn handle_status(
    config: Config,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    let pinecone_key_present = env_present(PINECONE_API_KEY);
    let gateway_key_present = env_present(GATEWAY_API_KEY);

    let (index, pinecone_error) = if pinecone_key_present {
        let api_key = std::env::var(PINECONE_API_KEY).unwrap_or_default();
        match PineconeClient::new(&config.pinecone, &api_key) {
            Ok(client) => match client.describe_index(&config.pinecone.index_name).await {
                Ok(description) => (description, None),
                Err(e) => (None, Some(e.to_string())),
            },
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, Some(format!("{PINECONE_API_KEY} not set")))
    };

    let status = StatusInfo {
        config_exists: config_path.as_ref().is_some_and(|p| p.exists()),
        config_path: config_path.map(|p| p.display().to_string()),
        data_dir: config.ingest.data_dir.display().to_string(),
        pinecone_key_present,
        gateway_key_present,
        gateway_url: config.gateway.base_url.clone(),
        embedding_provider: config.embedding.provider.to_string(),
        embedding_model: config.embedding.model.clone(),
        index_name: config.pinecone.index_name.clone(),
        index,
        pinecone_error,
    };

    print!("{}", formatter.format_status(&status));

    if !pinecone_key_present || !gateway_key_present {
        eprintln!();
        eprintln!("Hint: set the missing keys in .env or export them before running ingest.");
    } else if !config.ingest.data_dir.is_dir() {
        eprintln!();
        eprintln!(
            "Warning: data directory {} does not exist.",
            config.ingest.data_dir.display()
        );
    }

    Ok(())
}
