//! Generation phases and the artifacts they produce.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

/// A phase of a diagram generation.
///
/// Variants are declared in protocol order, so the derived `Ord` is the
/// progression order: a generation only ever moves to an equal or greater
/// phase. `Error` sorts last but is reachable from every non-terminal phase.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Started,
    ExplanationSent,
    Explanation,
    ExplanationChunk,
    MappingSent,
    Mapping,
    MappingChunk,
    DiagramSent,
    Diagram,
    DiagramChunk,
    Complete,
    Error,
}

impl Phase {
    /// Wire tag for this phase.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Resolve a wire tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let phase = match tag {
            "started" => Self::Started,
            "explanation_sent" => Self::ExplanationSent,
            "explanation" => Self::Explanation,
            "explanation_chunk" => Self::ExplanationChunk,
            "mapping_sent" => Self::MappingSent,
            "mapping" => Self::Mapping,
            "mapping_chunk" => Self::MappingChunk,
            "diagram_sent" => Self::DiagramSent,
            "diagram" => Self::Diagram,
            "diagram_chunk" => Self::DiagramChunk,
            "complete" => Self::Complete,
            "error" => Self::Error,
            _ => return None,
        };
        Some(phase)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// The artifact a chunk phase feeds, if this is a chunk phase.
    pub fn chunk_artifact(&self) -> Option<Artifact> {
        match self {
            Self::ExplanationChunk => Some(Artifact::Explanation),
            Self::MappingChunk => Some(Artifact::Mapping),
            Self::DiagramChunk => Some(Artifact::Diagram),
            _ => None,
        }
    }

    /// Human-readable progress label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Waiting",
            Self::Started => "Starting generation",
            Self::ExplanationSent => "Explanation requested",
            Self::Explanation | Self::ExplanationChunk => "Explaining repository",
            Self::MappingSent => "Mapping requested",
            Self::Mapping | Self::MappingChunk => "Mapping components",
            Self::DiagramSent => "Diagram requested",
            Self::Diagram | Self::DiagramChunk => "Drawing diagram",
            Self::Complete => "Complete",
            Self::Error => "Failed",
        }
    }
}

/// One of the three independently accumulated text artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Artifact {
    Explanation,
    Mapping,
    Diagram,
}

impl Artifact {
    /// The phase whose frames carry chunks of this artifact.
    pub fn chunk_phase(&self) -> Phase {
        match self {
            Self::Explanation => Phase::ExplanationChunk,
            Self::Mapping => Phase::MappingChunk,
            Self::Diagram => Phase::DiagramChunk,
        }
    }
}
