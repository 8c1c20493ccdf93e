use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, PathInfo, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file with defaults")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    config: Config,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    let path = config_path.context("could not determine config directory")?;

    match cmd {
        ConfigCommand::Init { force } => handle_init(&path, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(&config, &path, format),
        ConfigCommand::Path => handle_path(&path, formatter.as_ref()),
    }
}

fn handle_init(path: &Path, force: bool, formatter: &dyn Formatter) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save(path)
        .context("failed to write config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    if path.exists() {
        println!("# Config: {}", path.display());
    } else {
        println!("# Config: defaults ({} not found)", path.display());
    }
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn handle_path(path: &Path, formatter: &dyn Formatter) -> Result<()> {
    print!("{}", formatter.format_paths(&path_info(path)));
    Ok(())
}

fn path_info(path: &Path) -> PathInfo {
    let env_path = std::env::current_dir().ok().map(|cwd| cwd.join(".env"));
    PathInfo {
        config_path: path.display().to_string(),
        config_exists: path.exists(),
        env_exists: env_path.as_ref().is_some_and(|p| p.exists()),
        env_path: env_path.map(|p| p.display().to_string()),
    }
}
