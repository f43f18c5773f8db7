//! Generation state as observed by clients.

use serde::Serialize;

use gitdiagram_protocol::{CachedResult, Phase};

use crate::accumulator::Accumulator;
use crate::cache::{CACHED_EXPLANATION_PLACEHOLDER, CACHED_MAPPING_PLACEHOLDER};
use crate::error::mentions_api_key;

/// Progress message shown before the first frame arrives.
pub const STARTING_MESSAGE: &str = "Starting generation process...";

/// Snapshot of one generation attempt.
///
/// Once `phase` is [`Phase::Complete`] or [`Phase::Error`] the state is
/// terminal and no further frames change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationState {
    pub phase: Phase,
    /// Latest progress message from the server.
    pub message: Option<String>,
    pub explanation: Accumulator,
    pub mapping: Accumulator,
    pub diagram_text: Accumulator,
    /// Authoritative diagram text; only set at `complete`.
    pub final_diagram: Option<String>,
    pub error_message: Option<String>,
}

impl GenerationState {
    /// A fresh, idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state published as soon as a stream is requested.
    pub fn starting() -> Self {
        Self {
            phase: Phase::Started,
            message: Some(STARTING_MESSAGE.to_string()),
            ..Self::default()
        }
    }

    /// A terminal failure with no partial output.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Error,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A terminal `complete` state synthesized from a cache entry.
    pub fn from_cached(cached: &CachedResult) -> Self {
        let explanation = if cached.explanation.is_empty() {
            CACHED_EXPLANATION_PLACEHOLDER
        } else {
            cached.explanation.as_str()
        };
        let mapping = if cached.mapping.is_empty() {
            CACHED_MAPPING_PLACEHOLDER
        } else {
            cached.mapping.as_str()
        };

        Self {
            phase: Phase::Complete,
            message: None,
            explanation: explanation.into(),
            mapping: mapping.into(),
            diagram_text: cached.diagram.as_str().into(),
            final_diagram: Some(cached.diagram.clone()),
            error_message: None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.phase == Phase::Error
    }

    /// True when the generation failed because the server wants the user's
    /// own API key.
    pub fn requires_api_key(&self) -> bool {
        self.is_error() && self.error_message.as_deref().is_some_and(mentions_api_key)
    }

    /// The diagram to render: the final one once complete, otherwise the
    /// partial text streamed so far.
    pub fn diagram(&self) -> &str {
        self.final_diagram
            .as_deref()
            .unwrap_or(self.diagram_text.as_str())
    }
}
