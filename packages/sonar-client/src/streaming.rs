//! Server-sent events for streaming completions.
//!
//! Sonar streams `data: {json}` events terminated by `data: [DONE]`. Each
//! event carries a text delta and, usually, the full `citations` array so far.
//! Network reads can split an event (or a multi-byte character) anywhere, so
//! bytes are buffered until a full line is available.

use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::SonarError;

/// One decoded stream event.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletionChunk {
    pub delta: String,
    /// Citations reported with this event; empty when the event carries none
    pub citations: Vec<String>,
    /// Set on the terminal `[DONE]` event only
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    choices: Vec<EventChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EventChoice {
    #[serde(default)]
    delta: EventDelta,
}

#[derive(Debug, Default, Deserialize)]
struct EventDelta {
    content: Option<String>,
}

/// Line-oriented SSE decoder over raw bytes.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next event from complete lines, if any. Non-`data` fields and blank
    /// separator lines are consumed silently.
    fn next_event(&mut self) -> Option<Result<ChatCompletionChunk, SonarError>> {
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if let Some(event) = decode_line(&line) {
                return Some(event);
            }
        }
        None
    }

    /// Treat whatever is left as a final line.
    fn finish(&mut self) -> Option<Result<ChatCompletionChunk, SonarError>> {
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            self.pending.clear();
            return None;
        }
        self.pending.push(b'\n');
        self.next_event()
    }
}

fn decode_line(line: &[u8]) -> Option<Result<ChatCompletionChunk, SonarError>> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(e) => {
            return Some(Err(SonarError::Parse(format!(
                "Invalid UTF-8 in stream: {}",
                e
            ))))
        }
    };

    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(Ok(ChatCompletionChunk {
            done: true,
            ..Default::default()
        }));
    }

    let event = serde_json::from_str::<EventPayload>(data).map_err(|e| {
        SonarError::Parse(format!(
            "Malformed stream event: {} (data: {})",
            e,
            crate::truncate_to_char_boundary(data, 200)
        ))
    });

    Some(event.map(|payload| ChatCompletionChunk {
        delta: payload
            .choices
            .into_iter()
            .find_map(|choice| choice.delta.content)
            .unwrap_or_default(),
        citations: payload.citations,
        done: false,
    }))
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Stream of [`ChatCompletionChunk`]s over an SSE response body.
pub struct ChatCompletionStream {
    body: ByteStream,
    decoder: SseDecoder,
    exhausted: bool,
}

impl ChatCompletionStream {
    /// Wrap an SSE byte stream (normally `Response::bytes_stream()`).
    pub fn from_byte_stream(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            body: Box::pin(byte_stream),
            decoder: SseDecoder::default(),
            exhausted: false,
        }
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, SonarError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.decoder.next_event() {
                return Poll::Ready(Some(event));
            }
            if this.exhausted {
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.decoder.feed(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(SonarError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.exhausted = true;
                    return Poll::Ready(this.decoder.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
