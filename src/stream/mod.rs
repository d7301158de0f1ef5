pub mod reframer;
pub mod sse;

pub use reframer::{reframe_stream, try_parse_chunk, ReframeState, StreamReframer};
pub use sse::{encode_front_event, LineSplitter};
