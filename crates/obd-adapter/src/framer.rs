//! Inbound byte-stream framing

use tracing::warn;

/// Default upper bound for an unterminated frame
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Delimiters of one adapter family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDelimiters {
    /// Appended to every outgoing command
    pub command_terminator: u8,
    /// Ends every inbound response
    pub response_terminator: u8,
}

/// Splits the inbound stream on the response terminator.
///
/// Line endings leading a frame are the tail of the previous line and are
/// stripped; frames left empty are dropped. Everything after the first
/// non-line-ending byte is kept as is, since vendor payloads may be binary
/// and end in 0x0D or 0x0A. Text parsers trim their own trailing line endings
/// with `trim_trailing_line_endings`.
#[derive(Debug)]
pub struct Framer {
    terminator: u8,
    buffer: Vec<u8>,
    max_len: usize,
}

impl Framer {
    pub fn new(delimiters: FrameDelimiters) -> Self {
        Self::with_max_len(delimiters, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_len(delimiters: FrameDelimiters, max_len: usize) -> Self {
        Self {
            terminator: delimiters.response_terminator,
            buffer: Vec::with_capacity(64),
            max_len,
        }
    }

    /// Feed a chunk and collect every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if byte == self.terminator {
                let frame = std::mem::take(&mut self.buffer);
                let trimmed = trim_leading_line_endings(&frame);
                if !trimmed.is_empty() {
                    frames.push(trimmed.to_vec());
                }
                continue;
            }

            if self.buffer.len() >= self.max_len {
                warn!(
                    "Discarding {} buffered bytes without terminator",
                    self.buffer.len()
                );
                self.buffer.clear();
            }
            self.buffer.push(byte);
        }

        frames
    }

    /// Bytes received after the last terminator
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn is_line_ending(byte: &u8) -> bool {
    *byte == b'\r' || *byte == b'\n'
}

fn trim_leading_line_endings(frame: &[u8]) -> &[u8] {
    let start = frame.iter().position(|b| !is_line_ending(b)).unwrap_or(frame.len());
    &frame[start..]
}

/// For text frames only; binary payloads may legitimately end in CR or LF
pub(crate) fn trim_trailing_line_endings(frame: &[u8]) -> &[u8] {
    let end = frame.iter().rposition(|b| !is_line_ending(b)).map_or(0, |i| i + 1);
    &frame[..end]
}
