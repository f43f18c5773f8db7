//! HTTP client for the GitDiagram generation backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use gitdiagram_protocol::{CostEstimate, GenerateRequest};

use crate::config::GitDiagramConfig;
use crate::error::{DiagramError, Result};
use crate::transport::{ByteStream, CostEstimator, GenerationTransport};

const STREAM_PATH: &str = "/generate/stream";
const COST_PATH: &str = "/generate/cost";

/// Longest response body excerpt carried into an error.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the generation and cost endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url` (e.g. "https://api.gitdiagram.com").
    ///
    /// Only connecting is timed out; a generation stream may legitimately
    /// run for minutes.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &GitDiagramConfig) -> Result<Self> {
        Self::new(config.api_url.clone(), config.connect_timeout())
    }

    #[cfg(test)]
    pub(crate) fn from_host_root(host_root: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: host_root.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GenerationTransport for BackendClient {
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream> {
        let url = self.endpoint(STREAM_PATH);
        tracing::debug!(
            url = %url,
            username = %request.username,
            repo = %request.repo,
            has_api_key = request.api_key.is_some(),
            has_github_pat = request.github_pat.is_some(),
            "Opening generation stream"
        );

        let resp = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Generation request failed");
                DiagramError::StreamOpen(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, body = %preview(&body), "Generation stream rejected");
            return Err(DiagramError::StreamRejected {
                status: status.as_u16(),
            });
        }

        // A plain JSON body instead of a stream carries an error.
        if is_json(&resp) {
            let body = resp.text().await.map_err(|e| DiagramError::StreamRead(e.to_string()))?;
            return Err(match error_field(&body) {
                Some(message) => DiagramError::Protocol(message),
                None => DiagramError::StreamOpen(format!(
                    "unexpected JSON response: {}",
                    preview(&body)
                )),
            });
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| DiagramError::StreamRead(e.to_string())));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl CostEstimator for BackendClient {
    async fn estimate(&self, request: &GenerateRequest) -> Result<CostEstimate> {
        let url = self.endpoint(COST_PATH);
        tracing::debug!(url = %url, username = %request.username, repo = %request.repo, "Requesting cost estimate");

        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // The backend may still explain itself with an `{error}` body.
            if let Some(message) = error_field(&body) {
                return Ok(CostEstimate::failed(message));
            }
            tracing::error!(status = %status, url = %url, body = %preview(&body), "Cost estimate failed");
            return Err(DiagramError::HttpStatus {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn is_json(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false)
}

fn error_field(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.as_str().map(String::from))
        .filter(|e| !e.is_empty())
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let mut out: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        out.push_str("...");
        out
    } else {
        body.to_string()
    }
}
