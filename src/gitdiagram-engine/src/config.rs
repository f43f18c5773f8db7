//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use gitdiagram_protocol::Subject;

use crate::error::{DiagramError, Result};

/// Default generation backend.
pub const DEFAULT_API_URL: &str = "https://api.gitdiagram.com";

pub const API_URL_ENV: &str = "GITDIAGRAM_API_URL";
pub const DATA_DIR_ENV: &str = "GITDIAGRAM_DATA_DIR";
pub const KEYRING_SERVICE_ENV: &str = "GITDIAGRAM_KEYRING_SERVICE";

/// GitDiagram client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitDiagramConfig {
    /// Base URL of the generation backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// TCP connect timeout for backend requests, in seconds.
    /// Streams themselves are not timed out.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Repositories showcased as examples; these are read-only.
    #[serde(default = "default_example_subjects")]
    pub example_subjects: Vec<String>,

    /// Longest accepted custom instructions, in characters.
    #[serde(default = "default_max_instructions_len")]
    pub max_instructions_len: usize,

    /// Keyring service name under which credentials are stored.
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,

    /// Override of the local storage root.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_example_subjects() -> Vec<String> {
    [
        "fastapi/fastapi",
        "streamlit/streamlit",
        "pallets/flask",
        "tom-draper/api-analytics",
        "monkeytypegame/monkeytype",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_instructions_len() -> usize {
    1000
}

fn default_keyring_service() -> String {
    gitdiagram_keyring_store::DEFAULT_SERVICE.to_string()
}

impl Default for GitDiagramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            connect_timeout_secs: default_connect_timeout(),
            example_subjects: default_example_subjects(),
            max_instructions_len: default_max_instructions_len(),
            keyring_service: default_keyring_service(),
            data_dir: None,
        }
    }
}

impl GitDiagramConfig {
    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DiagramError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `GITDIAGRAM_*` environment overrides on top of this config.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(API_URL_ENV) {
            self.api_url = url;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(service) = lookup(KEYRING_SERVICE_ENV) {
            self.keyring_service = service;
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parsed example subjects. Entries that do not parse are skipped.
    pub fn example_subjects(&self) -> Vec<Subject> {
        self.example_subjects
            .iter()
            .filter_map(|raw| match raw.parse::<Subject>() {
                Ok(subject) => Some(subject),
                Err(e) => {
                    warn!(entry = %raw, error = %e, "Ignoring invalid example subject");
                    None
                }
            })
            .collect()
    }
}
