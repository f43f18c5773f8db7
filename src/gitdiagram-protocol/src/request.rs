//! Request payloads sent to the generation backend.

use serde::{Deserialize, Serialize};

use crate::subject::Subject;

/// Body of a generation (or cost) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub username: String,
    pub repo: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_pat: Option<String>,
}

impl GenerateRequest {
    pub fn new(subject: &Subject, instructions: impl Into<String>) -> Self {
        Self {
            username: subject.owner().to_string(),
            repo: subject.repository().to_string(),
            instructions: instructions.into(),
            api_key: None,
            github_pat: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_github_pat(mut self, github_pat: Option<String>) -> Self {
        self.github_pat = github_pat;
        self
    }
}

/// Response of the cost-estimation endpoint.
///
/// The backend reports failures in-band: `error` is set and `cost` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CostEstimate {
    pub fn ok(cost: impl Into<String>) -> Self {
        Self {
            cost: Some(cost.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            cost: None,
            error: Some(error.into()),
        }
    }

    /// The reported error, ignoring empty strings.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}
