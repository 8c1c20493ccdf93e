use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdfingest::cli::commands::{ConfigCommand, handle_config, handle_ingest, handle_status};
use pdfingest::cli::{Cli, Commands};
use pdfingest::models::{Config, OutputFormat, Secrets};

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/pdfingest/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/pdfingest/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: called from main before the async runtime starts its threads.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "pdfingest=debug" } else { "pdfingest=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    detect_and_set_ort_path();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().or_else(Config::config_path);
    let loaded = Config::load(cli.config.as_deref());
    let config = match (&cli.command, loaded) {
        // Allow replacing a broken file
        (Commands::Config(ConfigCommand::Init { .. }), Err(_)) => Config::default(),
        (_, loaded) => loaded.context("failed to load configuration")?,
    };
    let format = cli.format.unwrap_or(config.output.default_format);

    // Keys are checked and published before any document or network I/O.
    let secrets = if cli.command.needs_secrets() {
        let secrets = Secrets::from_env()?;
        secrets.export(&config.gateway);
        Some(secrets)
    } else {
        None
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run_command(
        cli.command,
        config,
        config_path,
        secrets,
        format,
        cli.verbose,
    ))
}

async fn run_command(
    command: Commands,
    config: Config,
    config_path: Option<PathBuf>,
    secrets: Option<Secrets>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Ingest(args) => {
            handle_ingest(args, config, secrets, format, verbose).await?;
        }
        Commands::Status => {
            handle_status(config, config_path, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, config, config_path, format, verbose).await?;
        }
    }

    Ok(())
}
