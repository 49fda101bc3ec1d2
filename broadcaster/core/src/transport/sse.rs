//! SSE Framing
//!
//! Wire format for the subscribe stream. Every block is self-contained and
//! becomes its own body chunk, so the transport flushes it immediately.
//!
//! # Block Format
//!
//! ```text
//! event: dispatched\n         ┐
//! data: <payload line 1>\n    │ event block
//! data: <payload line n>\n    │
//! \n                          ┘
//!
//! : keepalive\n               ┐ keepalive block
//! \n                          ┘
//! ```
//!
//! A payload containing line breaks (CRLF, CR or LF) is split into one
//! `data:` line per line, which a conforming client joins back together
//! with `\n`.

use axum::body::Bytes;

use crate::event::Event;

/// Name carried on every event block
pub const EVENT_NAME: &str = "dispatched";

/// Content type of the subscribe stream
pub const CONTENT_TYPE: &str = "text/event-stream";

/// Exact bytes of a keepalive block
pub const KEEPALIVE_BLOCK: &[u8] = b": keepalive\n\n";

/// One block on the subscribe stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A delivered event
    Event(Event),
    /// Idle filler that keeps intermediaries from timing out
    Keepalive,
}

impl Frame {
    /// Encode the block
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Event(event) => encode_event(event.payload()),
            Self::Keepalive => Bytes::from_static(KEEPALIVE_BLOCK),
        }
    }
}

fn encode_event(payload: &str) -> Bytes {
    let mut buf = String::with_capacity(payload.len() + EVENT_NAME.len() + 16);
    buf.push_str("event: ");
    buf.push_str(EVENT_NAME);
    buf.push('\n');

    // CRLF, CR and LF all end a line for SSE clients. Not `lines()`: a
    // trailing empty line must survive.
    for line in payload.split("\r\n").flat_map(|l| l.split(['\r', '\n'])) {
        buf.push_str("data: ");
        buf.push_str(line);
        buf.push('\n');
    }
    buf.push('\n');
    Bytes::from(buf)
}
