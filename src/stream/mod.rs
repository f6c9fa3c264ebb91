//! Event-stream framing and consumption
//!
//! The relay side frames provider fragments into `data:` events
//! ([`framer`]); the client side reassembles those events from arbitrary
//! body chunks and accumulates their content ([`consumer`]).

pub mod consumer;
pub mod framer;
pub mod lines;

pub use consumer::{consume_stream, StreamUpdate};
pub use framer::{fallback_stream, frame_stream, EventStream, StreamEvent};
pub use lines::LineBuffer;
