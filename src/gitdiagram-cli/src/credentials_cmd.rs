//! Credentials command: manage the locally stored API key and access token.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use gitdiagram_engine::GitDiagramConfig;
use gitdiagram_keyring_store::{CredentialKey, CredentialStore, KeyringStore};

/// Credentials CLI command.
#[derive(Debug, Args)]
pub struct CredentialsCli {
    #[command(subcommand)]
    pub subcommand: CredentialsSubcommand,
}

/// Credentials subcommands.
#[derive(Debug, Subcommand)]
pub enum CredentialsSubcommand {
    /// Store your own model API key, used for every generation
    SetApiKey {
        /// The API key
        key: String,
    },

    /// Store a GitHub personal access token for private repositories
    SetPat {
        /// The access token
        token: String,
    },

    /// Show which credentials are stored
    #[command(visible_alias = "ls")]
    Status,

    /// Remove every stored credential
    Clear,
}

impl CredentialsCli {
    pub fn run(self, config: &GitDiagramConfig) -> Result<()> {
        let store = KeyringStore::with_service(config.keyring_service.clone());

        match self.subcommand {
            CredentialsSubcommand::SetApiKey { key } => {
                set(&store, CredentialKey::ApiKey, &key)?;
                println!("API key saved.");
            }
            CredentialsSubcommand::SetPat { token } => {
                set(&store, CredentialKey::GithubPat, &token)?;
                println!("GitHub token saved.");
            }
            CredentialsSubcommand::Status => {
                for (label, key) in [
                    ("API key", CredentialKey::ApiKey),
                    ("GitHub token", CredentialKey::GithubPat),
                ] {
                    let stored = store
                        .get(key)
                        .with_context(|| format!("Failed to read {}", label))?
                        .is_some();
                    println!("{:<14} {}", label, if stored { "stored" } else { "not set" });
                }
                let used = store.flag(CredentialKey::UsedFreeGeneration)?;
                println!("{:<14} {}", "Free diagram", if used { "used" } else { "available" });
            }
            CredentialsSubcommand::Clear => {
                let mut removed = 0;
                for key in [
                    CredentialKey::ApiKey,
                    CredentialKey::GithubPat,
                    CredentialKey::UsedFreeGeneration,
                ] {
                    if store.delete(key)? {
                        removed += 1;
                    }
                }
                println!("Removed {} stored value(s).", removed);
            }
        }
        Ok(())
    }
}

fn set(store: &dyn CredentialStore, key: CredentialKey, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("Value cannot be empty");
    }
    store
        .set(key, value)
        .with_context(|| format!("Failed to store {}", key.as_str()))
}
