//! Stream frames.
//!
//! The backend emits one JSON record per `data: ` line. The record is loosely
//! typed on the wire ([`StreamMessage`]); clients validate it into a closed
//! [`Frame`] before it reaches any state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::{Artifact, Phase};

/// Marker that prefixes every data line of the stream.
pub const DATA_PREFIX: &str = "data:";

/// Message used when an `error` status carries no text.
const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Raw record as sent on the wire. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A validated stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Phase announcement (`started`, `*_sent`, `explanation`, `mapping`, `diagram`).
    Progress {
        phase: Phase,
        message: Option<String>,
    },
    /// Incremental text for one artifact. The chunk may be empty.
    Chunk { artifact: Artifact, chunk: String },
    /// Final frame. Each payload, when present, is authoritative.
    Complete {
        diagram: Option<String>,
        explanation: Option<String>,
        mapping: Option<String>,
    },
    /// Server-reported failure.
    Error { message: String },
    /// A phase tag this client does not know.
    Unknown { tag: String },
}

impl Frame {
    /// The phase this frame moves a generation to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Progress { phase, .. } => Some(*phase),
            Self::Chunk { artifact, .. } => Some(artifact.chunk_phase()),
            Self::Complete { .. } => Some(Phase::Complete),
            Self::Error { .. } => Some(Phase::Error),
            Self::Unknown { .. } => None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Why a record could not become a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Neither a `status` tag nor an `error` payload was present.
    MissingStatus,
    /// The line payload was not a valid record.
    Malformed(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStatus => write!(f, "Frame has neither a status nor an error"),
            Self::Malformed(reason) => write!(f, "Malformed frame: {}", reason),
        }
    }
}

impl std::error::Error for FrameError {}

impl TryFrom<StreamMessage> for Frame {
    type Error = FrameError;

    fn try_from(msg: StreamMessage) -> Result<Self, FrameError> {
        // An error payload wins over whatever phase the record declares.
        if let Some(error) = msg.error.filter(|e| !e.is_empty()) {
            return Ok(Frame::Error { message: error });
        }

        let tag = msg.status.ok_or(FrameError::MissingStatus)?;
        let Some(phase) = Phase::from_tag(&tag) else {
            return Ok(Frame::Unknown { tag });
        };

        if let Some(artifact) = phase.chunk_artifact() {
            return Ok(Frame::Chunk {
                artifact,
                chunk: msg.chunk.unwrap_or_default(),
            });
        }

        let frame = match phase {
            Phase::Idle => Frame::Unknown { tag },
            Phase::Complete => Frame::Complete {
                diagram: msg.diagram,
                explanation: msg.explanation,
                mapping: msg.mapping,
            },
            Phase::Error => Frame::Error {
                message: msg
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            },
            _ => Frame::Progress {
                phase,
                message: msg.message,
            },
        };
        Ok(frame)
    }
}

impl StreamMessage {
    /// Decode the payload of a single data line.
    pub fn from_json(payload: &str) -> Result<Self, FrameError> {
        serde_json::from_str(payload).map_err(|e| FrameError::Malformed(e.to_string()))
    }

    /// Encode as a complete data line, including the terminating blank line.
    pub fn to_data_line(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("{} {}\n\n", DATA_PREFIX, json)
    }

    pub fn progress(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            status: Some(phase.as_str().to_string()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn chunk(artifact: Artifact, chunk: impl Into<String>) -> Self {
        Self {
            status: Some(artifact.chunk_phase().as_str().to_string()),
            chunk: Some(chunk.into()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
