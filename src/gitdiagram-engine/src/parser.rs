//! Frame parser.
//!
//! Turns the raw bytes of a generation stream into validated [`Frame`]s.
//! Bytes are buffered until a newline arrives, so a line split across
//! network chunks is only decoded once it is whole. Lines without the
//! `data:` marker are ignored; a data line that fails to decode is logged
//! and skipped without ending the stream.

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::warn;

use gitdiagram_protocol::{DATA_PREFIX, Frame, FrameError, StreamMessage};

use crate::error::Result;
use crate::transport::ByteStream;

/// Longest line excerpt included in a log record.
const LOG_EXCERPT_CHARS: usize = 120;

/// Incremental, line-oriented frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    skipped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every frame completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(frame) = self.decode_line(&line[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Decode whatever is left once the transport closes.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        self.decode_line(&line)
    }

    /// Bytes received but not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of data lines dropped as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                self.skipped += 1;
                warn!(error = %e, "Skipping non UTF-8 stream line");
                return None;
            }
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        if payload.trim().is_empty() {
            return None;
        }

        match decode_payload(payload) {
            Ok(frame) => Some(frame),
            Err(e) => {
                self.skipped += 1;
                warn!(error = %e, line = %excerpt(line), "Skipping malformed frame");
                None
            }
        }
    }
}

fn decode_payload(payload: &str) -> std::result::Result<Frame, FrameError> {
    StreamMessage::from_json(payload).and_then(Frame::try_from)
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= LOG_EXCERPT_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(LOG_EXCERPT_CHARS).collect();
    out.push_str("...");
    out
}

/// Lazily decode a byte stream into frames.
///
/// The sequence ends when the transport closes, or right after yielding the
/// first transport error.
pub fn frames(mut bytes: ByteStream) -> impl Stream<Item = Result<Frame>> + Send {
    stream! {
        let mut decoder = FrameDecoder::new();
        let mut failed = false;

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for frame in decoder.feed(&chunk) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(e);
                    break;
                }
            }
        }

        if !failed {
            if let Some(frame) = decoder.finish() {
                yield Ok(frame);
            }
        }
    }
}
