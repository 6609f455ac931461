//! Incremental decoder for the chat-completion event stream
//!
//! The backend answers `POST /api/chat` with `text/event-stream` framing:
//! one `data: <payload>` line per event, where the payload is a
//! chat-completion chunk, an `{"error": ...}` object, or the `[DONE]`
//! sentinel. [`StreamDecoder`] is the synchronous framing state machine;
//! [`decode_stream`] drives it over an async byte source.

use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    types::{Perf, Usage},
};

/// Prefix of every data line
pub const DATA_MARKER: &str = "data:";

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Events decoded from the response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Non-empty fragment of generated text
    ContentDelta(String),
    /// Empty delta: the reasoning phase just ended
    ThinkingBoundary,
    /// Token usage reported by the server
    Usage(Usage),
    /// `[DONE]` sentinel
    Done,
    /// Server-reported or transport error
    Error(String),
}

impl StreamEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// A stream of decoded events
pub type StreamEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// What a single complete line turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not a data line
    Ignore,
    /// Data line whose payload did not parse. Usually a fragment split by the
    /// transport; never escalated.
    Skip,
    /// Events carried by the payload, in order
    Events(Vec<StreamEvent>),
}

/// Classify one complete line (without its line terminator)
pub fn classify_line(line: &str) -> LineOutcome {
    let Some(payload) = line.strip_prefix(DATA_MARKER) else {
        return LineOutcome::Ignore;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim_end() == DONE_SENTINEL {
        return LineOutcome::Events(vec![StreamEvent::Done]);
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(_) => return LineOutcome::Skip,
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Events(vec![StreamEvent::Error(error_text(error))]);
    }

    let mut events = Vec::new();

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);
    match delta {
        Some(text) if text.is_empty() => events.push(StreamEvent::ThinkingBoundary),
        Some(text) => events.push(StreamEvent::ContentDelta(text)),
        None => {}
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            perf: chunk.perf,
        }));
    }

    LineOutcome::Events(events)
}

fn error_text(error: serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(ref map) => match map.get("message") {
            Some(serde_json::Value::String(m)) => m.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

/// Framing state machine: bytes in, events out.
///
/// Holds back an incomplete UTF-8 sequence at the end of a chunk and any
/// trailing partial line until more bytes arrive. After a terminal event it
/// ignores further input.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending_bytes: Vec<u8>,
    line_buffer: String,
    finished: bool,
}

impl StreamDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been emitted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed a chunk of bytes, returning the events from every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return vec![];
        }
        self.decode_utf8(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=pos).collect();
            self.handle_line(line.trim_end_matches(['\n', '\r']), &mut events);
            if self.finished {
                self.line_buffer.clear();
                break;
            }
        }
        events
    }

    /// Signal end of input: flush held-back bytes and the final unterminated line
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return vec![];
        }
        if !self.pending_bytes.is_empty() {
            let rest = std::mem::take(&mut self.pending_bytes);
            self.line_buffer.push_str(&String::from_utf8_lossy(&rest));
        }

        let mut events = Vec::new();
        let line = std::mem::take(&mut self.line_buffer);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            self.handle_line(line, &mut events);
        }
        self.finished = true;
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        match classify_line(line) {
            LineOutcome::Ignore => {}
            LineOutcome::Skip => {
                tracing::trace!(len = line.len(), "skipping unparseable data line");
            }
            LineOutcome::Events(decoded) => {
                for event in decoded {
                    let terminal = event.is_terminal();
                    events.push(event);
                    if terminal {
                        self.finished = true;
                        return;
                    }
                }
            }
        }
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut start = 0;
        loop {
            let err = match std::str::from_utf8(&bytes[start..]) {
                Ok(text) => {
                    self.line_buffer.push_str(text);
                    return;
                }
                Err(err) => err,
            };

            let valid_end = start + err.valid_up_to();
            self.line_buffer
                .push_str(&String::from_utf8_lossy(&bytes[start..valid_end]));

            match err.error_len() {
                Some(len) => {
                    self.line_buffer.push(char::REPLACEMENT_CHARACTER);
                    start = valid_end + len;
                }
                None => {
                    // Incomplete sequence at the end: wait for the next chunk.
                    self.pending_bytes = bytes.split_off(valid_end);
                    return;
                }
            }
        }
    }
}

/// Decode an async byte source into a stream of events.
///
/// The stream ends after the first terminal event, when the source ends, or
/// when `cancel` fires. A read failure becomes a terminal
/// [`StreamEvent::Error`] unless `cancel` has fired, in which case the
/// stream ends silently.
pub fn decode_stream<S>(source: S, cancel: CancellationToken) -> StreamEventStream
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    Box::pin(stream! {
        let mut source = Box::pin(source);
        let mut decoder = StreamDecoder::new();
        let mut bytes_read = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(bytes_read, "stream read cancelled");
                    return;
                }
                next = source.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    bytes_read += chunk.len();
                    for event in decoder.push(&chunk) {
                        yield event;
                    }
                    if decoder.is_finished() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    if cancel.is_cancelled() || e.is_aborted() {
                        tracing::debug!(bytes_read, "read failed after cancellation");
                        return;
                    }
                    tracing::warn!(bytes_read, error = %e, "stream read failed");
                    yield StreamEvent::Error(e.user_message());
                    return;
                }
                None => {
                    for event in decoder.finish() {
                        yield event;
                    }
                    tracing::debug!(bytes_read, "stream ended");
                    return;
                }
            }
        }
    })
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    usage: Option<StreamUsage>,
    #[serde(default)]
    perf: Option<Perf>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
