//! Append-only text buffers for streamed artifacts.

use std::fmt;

use serde::Serialize;

/// Text built by left-to-right concatenation of chunk payloads.
///
/// A buffer only grows while a generation streams. The one exception is
/// [`Accumulator::settle`], applied when the final frame carries an
/// authoritative value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Accumulator(String);

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are no-ops; returns whether text was added.
    pub fn push_chunk(&mut self, chunk: &str) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.0.push_str(chunk);
        true
    }

    /// Replace the contents with an authoritative final value, if one was sent.
    pub(crate) fn settle(&mut self, authoritative: Option<String>) {
        if let Some(text) = authoritative {
            self.0 = text;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Accumulator {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Accumulator {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for Accumulator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
