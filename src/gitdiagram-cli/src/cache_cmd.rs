//! Cache command: inspect the local diagram cache.

use anyhow::Result;
use clap::{Args, Subcommand};

use gitdiagram_engine::GitDiagramConfig;

use crate::open_storage;

/// Cache CLI command.
#[derive(Debug, Args)]
pub struct CacheCli {
    #[command(subcommand)]
    pub subcommand: CacheSubcommand,
}

/// Cache subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheSubcommand {
    /// Count cached diagrams
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List cached diagrams, most recent first
    #[command(visible_alias = "ls")]
    List,
}

impl CacheCli {
    pub async fn run(self, config: &GitDiagramConfig) -> Result<()> {
        let storage = open_storage(config).await?;

        match self.subcommand {
            CacheSubcommand::Stats { json } => {
                let stats = storage.stats().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!("Total diagrams: {}", stats.total_diagrams);
                    println!("Own API key:    {}", stats.own_key_users);
                    println!("Free:           {}", stats.free_users);
                }
            }
            CacheSubcommand::List => {
                let diagrams = storage.list().await?;
                if diagrams.is_empty() {
                    println!("No cached diagrams.");
                    return Ok(());
                }
                for diagram in diagrams {
                    println!(
                        "{}/{}  {}",
                        diagram.username,
                        diagram.repo,
                        diagram.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Ok(())
    }
}
