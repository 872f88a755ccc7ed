//! Simulated streaming.
//!
//! The loop runs against a buffered completion API, so there is nothing to
//! stream while it works. `SimulatedStream` replays its result as events a
//! progressive client can render: every tool status first, then the final
//! text in fixed-size chunks with a short pause between them, then `done`.

use std::time::Duration;

use bizpilot_config::StreamConfig;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio::sync::mpsc;
use tracing::debug;

use crate::loop_runner::LoopResult;

pub const DEFAULT_CHUNK_SIZE: usize = 12;
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(15);

/// One event on the wire.
///
/// Serializes as `{"toolStatus": ...}`, `{"textChunk": ...}` or
/// `{"done": true}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    ToolStatus(String),
    TextChunk(String),
    Done,
}

impl StreamEvent {
    /// SSE `data:` payload for this event.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"done":true}"#.to_string())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::ToolStatus(status) => map.serialize_entry("toolStatus", status)?,
            Self::TextChunk(chunk) => map.serialize_entry("textChunk", chunk)?,
            Self::Done => map.serialize_entry("done", &true)?,
        }
        map.end()
    }
}

/// Split `text` into chunks of `size` characters. The last chunk may be
/// shorter; concatenating the chunks gives back `text`.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Paced replay of one loop result.
#[derive(Debug, Clone)]
pub struct SimulatedStream {
    final_text: String,
    status_events: Vec<String>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SimulatedStream {
    pub fn new(final_text: impl Into<String>, status_events: Vec<String>) -> Self {
        Self {
            final_text: final_text.into(),
            status_events,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    pub fn from_result(result: LoopResult) -> Self {
        Self::new(result.final_text, result.tool_status_events)
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_delay: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.chunk_delay = chunk_delay;
        self
    }

    pub fn with_config(self, config: &StreamConfig) -> Self {
        self.with_chunking(
            config.chunk_size,
            Duration::from_millis(config.chunk_delay_ms),
        )
    }

    /// The full event sequence, without pacing.
    pub fn events(&self) -> Vec<StreamEvent> {
        self.status_events
            .iter()
            .cloned()
            .map(StreamEvent::ToolStatus)
            .chain(
                chunk_text(&self.final_text, self.chunk_size)
                    .into_iter()
                    .map(StreamEvent::TextChunk),
            )
            .chain(std::iter::once(StreamEvent::Done))
            .collect()
    }

    /// Emit the events on a channel from a background task.
    ///
    /// Status events go out immediately, text chunks are spaced by the chunk
    /// delay. Dropping the receiver stops the task at its next send.
    pub fn emit(self) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for status in self.status_events {
                if tx.send(StreamEvent::ToolStatus(status)).await.is_err() {
                    debug!("Stream receiver dropped");
                    return;
                }
            }
            for (i, chunk) in chunk_text(&self.final_text, self.chunk_size)
                .into_iter()
                .enumerate()
            {
                if i > 0 && !self.chunk_delay.is_zero() {
                    tokio::time::sleep(self.chunk_delay).await;
                }
                if tx.send(StreamEvent::TextChunk(chunk)).await.is_err() {
                    debug!("Stream receiver dropped");
                    return;
                }
            }
            let _ = tx.send(StreamEvent::Done).await;
        });
        rx
    }
}
