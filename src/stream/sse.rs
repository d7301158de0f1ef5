//! SSE line splitting for the upstream body and frame encoding for the
//! Front event stream.
//!
//! The upstream emits `data: <json>` lines; a line may straddle any number
//! of body chunks, so the splitter carries the unterminated tail forward.

use crate::protocol::front::FrontStreamEvent;
use bytes::{Buf, BytesMut};
use memchr::{memchr, memchr_iter};
use tracing::trace;

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";
/// Longest unterminated line carried across chunks before it is dropped.
const MAX_PENDING_LINE: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// LineSplitter — incremental `\n` splitter over raw bytes
// ---------------------------------------------------------------------------

/// Splits a chunked byte stream into lines.
///
/// Lines are split on raw `\n` bytes, so a multi-byte UTF-8 sequence is never
/// cut. A trailing `\r` is stripped from every line. A line longer than
/// `MAX_PENDING_LINE` is dropped up to its terminating `\n`.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: BytesMut,
    discarding: bool,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and call `on_line` for every completed line.
    pub fn push(&mut self, chunk: &[u8], mut on_line: impl FnMut(&[u8])) {
        let mut chunk = chunk;
        if self.discarding {
            let Some(end) = memchr(b'\n', chunk) else {
                return;
            };
            self.discarding = false;
            chunk = &chunk[end + 1..];
        }

        if self.pending.is_empty() {
            let consumed = split_lines(chunk, &mut on_line);
            self.pending.extend_from_slice(&chunk[consumed..]);
        } else {
            self.pending.extend_from_slice(chunk);
            let consumed = split_lines(&self.pending, &mut on_line);
            self.pending.advance(consumed);
        }

        if self.pending.len() > MAX_PENDING_LINE {
            trace!(len = self.pending.len(), "dropping oversized stream line");
            self.pending.clear();
            self.discarding = true;
        }
    }

    /// Flush an unterminated final line, if any.
    pub fn finish(&mut self, mut on_line: impl FnMut(&[u8])) {
        self.discarding = false;
        if self.pending.is_empty() {
            return;
        }
        let line = self.pending.split();
        on_line(strip_cr(&line));
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn split_lines(buf: &[u8], on_line: &mut impl FnMut(&[u8])) -> usize {
    let mut start = 0;
    for end in memchr_iter(b'\n', buf) {
        on_line(strip_cr(&buf[start..end]));
        start = end + 1;
    }
    start
}

#[inline]
fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

// ---------------------------------------------------------------------------
// Upstream line helpers
// ---------------------------------------------------------------------------

/// Payload of a `data: ` line. Any other line (comments, keep-alives,
/// `event:` fields) yields `None`.
#[must_use]
pub fn data_payload(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(DATA_PREFIX)
}

/// Whether a `data:` payload is the end-of-stream sentinel.
#[must_use]
pub fn is_done_payload(payload: &[u8]) -> bool {
    payload.trim_ascii() == DONE_SENTINEL
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Format a Front SSE frame: `event: <name>\ndata: <json>\n\n`.
#[must_use]
pub fn front_sse_frame(event_type: &str, json: &str) -> String {
    let mut out = String::with_capacity(16 + event_type.len() + json.len());
    out.push_str("event: ");
    out.push_str(event_type);
    out.push_str("\ndata: ");
    out.push_str(json);
    out.push_str("\n\n");
    out
}

/// Append one encoded Front event to `out`.
///
/// On error `out` is left as it was before the call.
///
/// # Errors
///
/// Returns the serializer error if the event cannot be encoded as JSON.
pub fn encode_front_event(
    event: &FrontStreamEvent,
    out: &mut Vec<u8>,
) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string(event)?;
    out.extend_from_slice(front_sse_frame(event.event_name(), &json).as_bytes());
    Ok(())
}
