//! Phase state machine.
//!
//! A single reducer folds validated frames into a [`GenerationState`]:
//!
//! - phases only move forward in protocol order; a frame announcing an
//!   earlier phase still merges its payload but leaves the phase alone,
//! - chunks append to their artifact and move the phase to that
//!   artifact's chunk phase,
//! - an error frame is terminal from any non-terminal phase,
//! - the complete frame prefers its own payloads over the accumulated text,
//! - once terminal, every further frame is ignored.

use tracing::{debug, trace};

use gitdiagram_protocol::{Artifact, Frame, Phase};

use crate::state::GenerationState;

/// Effect of feeding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state did not change.
    Ignored,
    /// The state changed and is still live.
    Updated,
    /// The generation reached `complete`.
    Completed,
    /// The generation reached `error`.
    Failed,
}

impl Transition {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[inline]
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Owns the state of one generation attempt.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    state: GenerationState,
}

impl PhaseMachine {
    /// A machine in the `started` phase.
    pub fn new() -> Self {
        Self::with_state(GenerationState::starting())
    }

    pub fn with_state(state: GenerationState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn into_state(self) -> GenerationState {
        self.state
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Fold one frame into the state.
    pub fn apply(&mut self, frame: Frame) -> Transition {
        if self.is_terminal() {
            trace!(phase = %self.state.phase, "Ignoring frame after terminal phase");
            return Transition::Ignored;
        }

        match frame {
            Frame::Unknown { tag } => {
                debug!(tag = %tag, "Ignoring unknown phase tag");
                Transition::Ignored
            }
            Frame::Error { message } => self.fail(message),
            Frame::Progress { phase, message } => {
                let advanced = self.advance(phase);
                let has_message = message.is_some();
                if has_message {
                    self.state.message = message;
                }
                if advanced || has_message {
                    Transition::Updated
                } else {
                    Transition::Ignored
                }
            }
            Frame::Chunk { artifact, chunk } => {
                let buffer = match artifact {
                    Artifact::Explanation => &mut self.state.explanation,
                    Artifact::Mapping => &mut self.state.mapping,
                    Artifact::Diagram => &mut self.state.diagram_text,
                };
                if !buffer.push_chunk(&chunk) {
                    return Transition::Ignored;
                }
                self.advance(artifact.chunk_phase());
                Transition::Updated
            }
            Frame::Complete {
                diagram,
                explanation,
                mapping,
            } => {
                let final_diagram =
                    diagram.unwrap_or_else(|| self.state.diagram_text.as_str().to_string());
                self.state.final_diagram = Some(final_diagram);
                self.state.explanation.settle(explanation);
                self.state.mapping.settle(mapping);
                self.state.phase = Phase::Complete;
                debug!(
                    explanation_len = self.state.explanation.len(),
                    mapping_len = self.state.mapping.len(),
                    "Generation complete"
                );
                Transition::Completed
            }
        }
    }

    /// Force the terminal `error` phase with a verbatim message.
    pub fn fail(&mut self, message: impl Into<String>) -> Transition {
        if self.is_terminal() {
            return Transition::Ignored;
        }
        let message = message.into();
        debug!(phase = %self.state.phase, error = %message, "Generation failed");
        self.state.phase = Phase::Error;
        self.state.error_message = Some(message);
        Transition::Failed
    }

    /// Move forward to `phase`; never backward and never into a terminal
    /// phase (those have their own frames).
    fn advance(&mut self, phase: Phase) -> bool {
        if phase.is_terminal() || phase <= self.state.phase {
            return false;
        }
        trace!(from = %self.state.phase, to = %phase, "Phase transition");
        self.state.phase = phase;
        true
    }
}
