//! Server-Sent Events (SSE) reader.
//!
//! Chat-completion providers stream replies as `data:` lines separated by
//! blank lines. This module turns any buffered byte source (or a live
//! `reqwest` response) into a stream of [`SseEvent`]s.

use crate::traits::LlmError;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type, when the server names one.
    pub event: Option<String>,
    /// The event payload; multi-line data is joined with `\n`.
    pub data: String,
}

/// Parse SSE events from a buffered reader.
pub fn events<R>(reader: R) -> impl Stream<Item = Result<SseEvent, LlmError>> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    try_stream! {
        let mut lines = reader.lines();
        let mut current_event: Option<String> = None;
        let mut current_data = String::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| LlmError::Stream(e.to_string()))?
        {
            if line.is_empty() {
                if !current_data.is_empty() {
                    yield SseEvent {
                        event: current_event.take(),
                        data: std::mem::take(&mut current_data),
                    };
                }
                current_event = None;
                continue;
            }

            if let Some(event_type) = field(&line, "event") {
                current_event = Some(event_type.to_string());
            } else if let Some(data) = field(&line, "data") {
                if !current_data.is_empty() {
                    current_data.push('\n');
                }
                current_data.push_str(data);
            }
            // id:, retry: and ":" comments carry nothing we use
        }

        if !current_data.is_empty() {
            yield SseEvent {
                event: current_event,
                data: current_data,
            };
        }
    }
}

/// Parse SSE events from the body of a live HTTP response.
pub fn response_events(
    response: reqwest::Response,
) -> impl Stream<Item = Result<SseEvent, LlmError>> + Send {
    let bytes = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    );
    events(BufReader::new(StreamReader::new(bytes)))
}

/// `name: value` or `name:value`; one optional leading space is dropped.
fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
