//! Generation commands: generate, modify, regenerate.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use gitdiagram_engine::{
    BackendClient, Collaborators, GenerationState, GitDiagramConfig, SessionController,
    SessionSnapshot,
};
use gitdiagram_keyring_store::{CredentialStore, KeyringStore};
use gitdiagram_protocol::{Phase, Subject};

use crate::open_storage;

/// Output options shared by the generation commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write the diagram to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the final session snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Repository as owner/repo or a GitHub URL
    pub repo: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the modify command.
#[derive(Debug, Args)]
pub struct ModifyArgs {
    /// Repository as owner/repo or a GitHub URL
    pub repo: String,

    /// How the diagram should change
    pub instructions: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the regenerate command.
#[derive(Debug, Args)]
pub struct RegenerateArgs {
    /// Repository as owner/repo or a GitHub URL
    pub repo: String,

    /// Optional custom instructions
    #[arg(default_value = "")]
    pub instructions: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl GenerateArgs {
    pub async fn run(self, config: &GitDiagramConfig) -> Result<ExitCode> {
        let subject = parse_subject(&self.repo)?;
        let controller = build_controller(config).await?;
        let progress = spawn_progress(controller.subscribe());

        let state = controller.start(subject).await;
        finish(controller, progress, &state, &self.output).await
    }
}

impl ModifyArgs {
    pub async fn run(self, config: &GitDiagramConfig) -> Result<ExitCode> {
        let subject = parse_subject(&self.repo)?;
        let controller = build_controller(config).await?;
        let progress = spawn_progress(controller.subscribe());

        let state = controller.modify(subject, &self.instructions).await?;
        finish(controller, progress, &state, &self.output).await
    }
}

impl RegenerateArgs {
    pub async fn run(self, config: &GitDiagramConfig) -> Result<ExitCode> {
        let subject = parse_subject(&self.repo)?;
        let controller = build_controller(config).await?;
        let progress = spawn_progress(controller.subscribe());

        let state = controller.regenerate(subject, &self.instructions).await?;
        finish(controller, progress, &state, &self.output).await
    }
}

fn parse_subject(repo: &str) -> Result<Subject> {
    repo.parse()
        .with_context(|| format!("Invalid repository '{}'", repo))
}

async fn build_controller(config: &GitDiagramConfig) -> Result<SessionController> {
    let client = Arc::new(
        BackendClient::from_config(config).context("Failed to create backend client")?,
    );
    let storage = Arc::new(open_storage(config).await?);
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(KeyringStore::with_service(config.keyring_service.clone()));

    tracing::debug!(api_url = %client.base_url(), "Session controller ready");

    Ok(SessionController::new(
        Collaborators {
            transport: client.clone(),
            estimator: client,
            cache: storage.clone(),
            last_generated: storage,
            credentials,
        },
        config,
    ))
}

/// Print a line whenever the phase or progress message changes.
fn spawn_progress(mut rx: watch::Receiver<SessionSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(Phase, Option<String>)> = None;
        let mut cost_shown = false;

        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();

            if !cost_shown && let Some(cost) = &snapshot.cost {
                eprintln!("Estimated cost: {}", cost);
                cost_shown = true;
            }

            let state = &snapshot.state;
            if state.phase == Phase::Idle || state.is_terminal() {
                continue;
            }
            let current = (state.phase, state.message.clone());
            if last.as_ref() == Some(&current) {
                continue;
            }
            match &state.message {
                Some(message) => eprintln!("[{}] {}", state.phase.label(), message),
                None => eprintln!("[{}]", state.phase.label()),
            }
            last = Some(current);
        }
    })
}

async fn finish(
    controller: SessionController,
    progress: JoinHandle<()>,
    state: &GenerationState,
    output: &OutputArgs,
) -> Result<ExitCode> {
    let snapshot = controller.snapshot();
    // Closing the channel ends the progress task.
    drop(controller);
    let _ = progress.await;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if !state.is_complete() {
        let message = state
            .error_message
            .as_deref()
            .unwrap_or("Generation did not complete");
        eprintln!("Generation failed: {}", message);
        if state.requires_api_key() {
            eprintln!("Add your own key with: gitdiagram credentials set-api-key <KEY>");
        }
        return Ok(ExitCode::FAILURE);
    }

    let diagram = state.diagram();
    match &output.output {
        Some(path) => {
            std::fs::write(path, diagram)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Diagram written to {}", path.display());
        }
        None if !output.json => println!("{}", diagram),
        None => {}
    }

    if let Some(last_generated) = snapshot.last_generated {
        eprintln!("Last generated: {}", last_generated.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(ExitCode::SUCCESS)
}
