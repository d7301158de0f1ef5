use super::sse::{data_payload, encode_front_event, is_done_payload, LineSplitter};
use crate::observability::RequestLog;
use crate::protocol::back::BackStreamChunk;
use crate::protocol::front::{
    FrontDelta, FrontDeltaUsage, FrontMessageDelta, FrontResponse, FrontResponseBlock,
    FrontStreamEvent, FrontUsage,
};
use crate::protocol::mapping::back_finish_to_front_stop;
use crate::util::generated_message_id;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{trace, warn};

/// The single text block this protocol pair streams.
const BLOCK_INDEX: usize = 0;

/// Cross-chunk state of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReframeState {
    /// Last `usage.completion_tokens` seen; later frames overwrite.
    pub output_tokens: u64,
    /// Set once the terminal sequence has been emitted.
    pub stopped: bool,
}

impl ReframeState {
    fn push_line(&mut self, line: &[u8], out: &mut Vec<FrontStreamEvent>) {
        let Some(payload) = data_payload(line) else {
            return;
        };
        if is_done_payload(payload) {
            return;
        }
        match try_parse_chunk(payload) {
            Some(chunk) => self.apply_chunk(&chunk, out),
            None => trace!(len = payload.len(), "dropping unparseable stream frame"),
        }
    }

    fn apply_chunk(&mut self, chunk: &BackStreamChunk, out: &mut Vec<FrontStreamEvent>) {
        if !self.stopped {
            self.emit_events(chunk, out);
        }
        // Read after the terminal sequence: a finish frame reports the usage
        // seen before it, and anything later only reaches the completion log.
        if let Some(tokens) = chunk.completion_tokens() {
            self.output_tokens = tokens;
        }
    }

    fn emit_events(&mut self, chunk: &BackStreamChunk, out: &mut Vec<FrontStreamEvent>) {
        if let Some(text) = chunk.content_fragment() {
            out.push(FrontStreamEvent::ContentBlockDelta {
                index: BLOCK_INDEX,
                delta: FrontDelta::TextDelta {
                    text: text.to_string(),
                },
            });
        }
        if let Some(reason) = chunk.finish_reason() {
            out.push(FrontStreamEvent::ContentBlockStop { index: BLOCK_INDEX });
            out.push(FrontStreamEvent::MessageDelta {
                delta: FrontMessageDelta {
                    stop_reason: back_finish_to_front_stop(Some(reason)),
                },
                usage: FrontDeltaUsage {
                    output_tokens: self.output_tokens,
                },
            });
            out.push(FrontStreamEvent::MessageStop {});
            self.stopped = true;
        }
    }
}

/// Decode one `data:` payload. `None` means the frame is skipped.
#[must_use]
pub fn try_parse_chunk(payload: &[u8]) -> Option<BackStreamChunk> {
    serde_json::from_slice(payload).ok()
}

/// Re-frames an upstream chat-completion delta stream as Front events.
///
/// One instance per request. Feed upstream body chunks in arrival order with
/// [`StreamReframer::push_chunk`] and call [`StreamReframer::finish`] at EOF.
#[derive(Debug)]
pub struct StreamReframer {
    message_id: String,
    model: String,
    lines: LineSplitter,
    state: ReframeState,
}

impl StreamReframer {
    /// `model` is the Front model the caller asked for.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_message_id(generated_message_id(), model)
    }

    #[must_use]
    pub fn with_message_id(message_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            model: model.into(),
            lines: LineSplitter::new(),
            state: ReframeState::default(),
        }
    }

    /// `message_start` followed by `content_block_start` for the text block.
    #[must_use]
    pub fn start_events(&self) -> [FrontStreamEvent; 2] {
        [
            FrontStreamEvent::MessageStart {
                message: FrontResponse::assistant(
                    self.message_id.clone(),
                    self.model.clone(),
                    Vec::new(),
                    None,
                    FrontUsage::default(),
                ),
            },
            FrontStreamEvent::ContentBlockStart {
                index: BLOCK_INDEX,
                content_block: FrontResponseBlock::Text {
                    text: String::new(),
                },
            },
        ]
    }

    pub fn push_chunk(&mut self, chunk: &[u8], out: &mut Vec<FrontStreamEvent>) {
        let state = &mut self.state;
        self.lines.push(chunk, |line| state.push_line(line, out));
    }

    /// Flush the unterminated tail at upstream EOF. Never synthesizes a stop.
    pub fn finish(&mut self, out: &mut Vec<FrontStreamEvent>) {
        let state = &mut self.state;
        self.lines.finish(|line| state.push_line(line, out));
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.stopped
    }

    #[must_use]
    pub fn state(&self) -> ReframeState {
        self.state
    }

    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

// ---------------------------------------------------------------------------
// Body stream
// ---------------------------------------------------------------------------

enum Phase {
    Start,
    Streaming,
    Done,
}

struct ReframeBody<S> {
    upstream: std::pin::Pin<Box<S>>,
    reframer: StreamReframer,
    log: RequestLog,
    events: Vec<FrontStreamEvent>,
    phase: Phase,
}

impl<S> ReframeBody<S> {
    /// Encode and drain pending events into one buffer.
    fn flush(&mut self) -> Option<Bytes> {
        if self.events.is_empty() {
            return None;
        }
        let mut buf = Vec::with_capacity(128 * self.events.len());
        for event in self.events.drain(..) {
            if let Err(err) = encode_front_event(&event, &mut buf) {
                warn!(event = event.event_name(), error = %err, "failed to encode stream event");
            }
        }
        Some(Bytes::from(buf))
    }

    fn end(&mut self) -> Option<Bytes> {
        self.reframer.finish(&mut self.events);
        self.phase = Phase::Done;
        let state = self.reframer.state();
        if !state.stopped {
            warn!(
                message_id = self.reframer.message_id(),
                "upstream stream ended without finish_reason"
            );
        }
        self.log.complete(FrontUsage {
            input_tokens: 0,
            output_tokens: state.output_tokens,
        });
        self.flush()
    }
}

/// Turn an upstream body stream into the outbound Front SSE body.
///
/// The start events are yielded before the upstream is first polled. Each
/// upstream chunk is re-framed in full and flushed as one buffer.
pub fn reframe_stream<S, E>(
    upstream: S,
    reframer: StreamReframer,
    log: RequestLog,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let body = ReframeBody {
        upstream: Box::pin(upstream),
        reframer,
        log,
        events: Vec::with_capacity(8),
        phase: Phase::Start,
    };

    futures_util::stream::unfold(body, |mut body| async move {
        loop {
            match body.phase {
                Phase::Done => return None,
                Phase::Start => {
                    body.events.extend(body.reframer.start_events());
                    body.phase = Phase::Streaming;
                    if let Some(bytes) = body.flush() {
                        return Some((Ok(bytes), body));
                    }
                }
                Phase::Streaming => {
                    let next = body.upstream.as_mut().next().await;
                    let flushed = match next {
                        Some(Ok(chunk)) => {
                            body.reframer.push_chunk(&chunk, &mut body.events);
                            body.flush()
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "upstream stream read failed");
                            body.end()
                        }
                        None => body.end(),
                    };
                    if let Some(bytes) = flushed {
                        return Some((Ok(bytes), body));
                    }
                }
            }
        }
    })
}
