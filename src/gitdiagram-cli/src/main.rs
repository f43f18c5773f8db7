//! GitDiagram CLI - generate architecture diagrams for GitHub repositories.

mod cache_cmd;
mod credentials_cmd;
mod generate_cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gitdiagram_engine::GitDiagramConfig;
use gitdiagram_storage::{DiagramStorage, GitDiagramPaths};

use cache_cmd::CacheCli;
use credentials_cmd::CredentialsCli;
use generate_cmd::{GenerateArgs, ModifyArgs, RegenerateArgs};

/// GitDiagram command-line client
#[derive(Parser)]
#[command(name = "gitdiagram")]
#[command(about = "Turn any GitHub repository into an interactive diagram")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Generation backend URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the diagram for a repository, generating it if needed
    Generate(GenerateArgs),

    /// Generate a new diagram following custom instructions
    Modify(ModifyArgs),

    /// Regenerate a diagram from scratch
    Regenerate(RegenerateArgs),

    /// Manage locally stored credentials
    Credentials(CredentialsCli),

    /// Inspect the local diagram cache
    Cache(CacheCli),
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<GitDiagramConfig> {
    let mut config = match &cli.config {
        Some(path) => GitDiagramConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GitDiagramConfig::default(),
    };
    config.apply_env();
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    Ok(config)
}

/// Open (and create) the diagram cache described by `config`.
pub(crate) async fn open_storage(config: &GitDiagramConfig) -> Result<DiagramStorage> {
    let storage = match &config.data_dir {
        Some(dir) => DiagramStorage::with_paths(GitDiagramPaths::from_root(dir.clone())),
        None => DiagramStorage::new().context("Failed to locate data directory")?,
    };
    storage
        .init()
        .await
        .context("Failed to initialize diagram storage")?;
    Ok(storage)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Generate(args) => args.run(&config).await,
        Command::Modify(args) => args.run(&config).await,
        Command::Regenerate(args) => args.run(&config).await,
        Command::Credentials(cmd) => cmd.run(&config).map(|()| ExitCode::SUCCESS),
        Command::Cache(cmd) => cmd.run(&config).await.map(|()| ExitCode::SUCCESS),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
