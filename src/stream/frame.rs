use futures::stream::Stream;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TaskLinkError;
use crate::util::text::preview;

const SSE_DATA_PREFIX: &str = "data:";
const SSE_DONE_MARKER: &str = "[DONE]";
const SSE_FIELD_PREFIXES: [&str; 3] = ["event:", "id:", "retry:"];

/// Outcome of one reconstruction step.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Value(Value),
    /// A complete line that was not JSON. Non-fatal; the caller logs and moves on.
    Malformed { line: String },
}

enum LineOutcome {
    Value(Value),
    Skip,
    Malformed(String),
}

/// Incremental decoder for one response body.
///
/// Feed raw chunks with [`push`](Self::push) in arrival order; values come out
/// in the order their closing boundary was seen. Bytes of a multi-byte
/// character split across chunks are held back until the character completes.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    text: String,
    emitted: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values produced so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Accumulate a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);
        self.drain_utf8();

        let mut frames = Vec::new();

        // Whole accumulated text as one document.
        if let Ok(value) = serde_json::from_str::<Value>(&self.text) {
            self.text.clear();
            self.emit(value, &mut frames);
            return frames;
        }

        // Otherwise split on newlines, keeping the trailing partial line.
        let Some(last_newline) = self.text.rfind('\n') else {
            return frames;
        };
        let remainder = self.text.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.text, remainder);

        for line in complete.split('\n') {
            match parse_line(line) {
                LineOutcome::Value(value) => self.emit(value, &mut frames),
                LineOutcome::Skip => {}
                LineOutcome::Malformed(line) => frames.push(Frame::Malformed { line }),
            }
        }
        frames
    }

    /// Flush at end of stream. A trailing fragment that does not parse is discarded.
    pub fn finish(mut self) -> Vec<Frame> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.text.push_str(&String::from_utf8_lossy(&rest));
        }

        let mut frames = Vec::new();
        let rest = std::mem::take(&mut self.text);
        if rest.trim().is_empty() {
            return frames;
        }

        if let Ok(value) = serde_json::from_str::<Value>(&rest) {
            self.emit(value, &mut frames);
        } else if let LineOutcome::Value(value) = parse_line(&rest) {
            self.emit(value, &mut frames);
        } else {
            debug!(fragment = %preview(&rest), "discarding incomplete trailing fragment");
        }
        frames
    }

    fn emit(&mut self, value: Value, frames: &mut Vec<Frame>) {
        self.emitted += 1;
        frames.push(Frame::Value(value));
    }

    fn drain_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for the next chunk.
                        None => {
                            self.pending.drain(..valid_up_to);
                            return;
                        }
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + bad);
                        }
                    }
                }
            }
        }
    }
}

fn parse_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    if let Some(data) = line.strip_prefix(SSE_DATA_PREFIX) {
        let data = data.trim();
        if data.is_empty() || data == SSE_DONE_MARKER {
            return LineOutcome::Skip;
        }
        return match serde_json::from_str(data) {
            Ok(value) => LineOutcome::Value(value),
            Err(_) => LineOutcome::Malformed(data.to_string()),
        };
    }

    // SSE comments and non-data fields carry no payload.
    if line.starts_with(':') || SSE_FIELD_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return LineOutcome::Skip;
    }

    match serde_json::from_str(line) {
        Ok(value) => LineOutcome::Value(value),
        Err(_) => LineOutcome::Malformed(line.to_string()),
    }
}

/// Adapt a byte stream into a stream of parsed values.
///
/// Malformed lines are logged and skipped. A transport error ends the stream
/// after being yielded.
pub fn decode_frames<S, B, E>(
    bytes: S,
) -> impl Stream<Item = Result<Value, TaskLinkError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TaskLinkError> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            for frame in decoder.push(chunk.as_ref()) {
                match frame {
                    Frame::Value(value) => yield Ok(value),
                    Frame::Malformed { line } => {
                        let err = TaskLinkError::FrameParse { line: preview(&line) };
                        warn!(error = %err, "skipping unparseable stream line");
                    }
                }
            }
        }

        let emitted = decoder.emitted();
        for frame in decoder.finish() {
            if let Frame::Value(value) = frame {
                yield Ok(value);
            }
        }
        debug!(emitted, "stream completed");
    }
}
