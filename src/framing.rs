//! Event-stream transport framing
//!
//! Splits a byte stream into frames at blank-line boundaries without
//! interpreting their payload. Used on both sides of the relay: by the
//! generation clients to cut the oracle's stream into [`RawChunk`]s, and by
//! the consumer to read the relay's own event stream.

use futures::stream::{self, Stream, StreamExt};

/// One oracle-framed unit, exactly as it arrived on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk(Vec<u8>);

impl RawChunk {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The frame's `data:` payload, multiple lines joined by `\n`.
    ///
    /// Returns `Ok(None)` for frames that carry no data (comments,
    /// keep-alives, bare `event:` lines).
    pub fn data(&self) -> Result<Option<String>, std::str::Utf8Error> {
        let text = std::str::from_utf8(&self.0)?;
        let mut lines = text.lines().filter_map(|line| {
            line.strip_prefix("data:")
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        });
        let Some(first) = lines.next() else {
            return Ok(None);
        };
        let mut data = first.to_string();
        for line in lines {
            data.push('\n');
            data.push_str(line);
        }
        Ok(Some(data))
    }
}

impl From<&str> for RawChunk {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Incremental splitter holding at most one incomplete frame
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
    /// Last byte seen was a CR; an LF right after it ends the same line
    after_cr: bool,
    /// Prefix of `buffer` already searched for a frame boundary
    scanned: usize,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every frame they complete, in order.
    ///
    /// `\r\n`, `\r` and `\n` all end a line and are stored as `\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<RawChunk> {
        self.buffer.reserve(bytes.len());
        for &byte in bytes {
            let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');
            match byte {
                b'\n' if after_cr => {}
                b'\r' => self.buffer.push(b'\n'),
                _ => self.buffer.push(byte),
            }
        }

        let mut frames = Vec::new();
        // A boundary may straddle the end of the previous scan
        let mut start = self.scanned.saturating_sub(1);
        while let Some(offset) = self
            .buffer
            .get(start..)
            .and_then(|tail| tail.windows(2).position(|w| w == b"\n\n"))
        {
            let end = start + offset;
            let rest = self.buffer.split_off(end + 2);
            let mut frame = std::mem::replace(&mut self.buffer, rest);
            frame.truncate(end);
            if !frame.is_empty() {
                frames.push(RawChunk(frame));
            }
            start = 0;
        }
        self.scanned = self.buffer.len();
        frames
    }

    /// Flush whatever is left when the byte stream ends.
    pub fn finish(&mut self) -> Option<RawChunk> {
        self.after_cr = false;
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        let trimmed = rest.strip_suffix(b"\n").unwrap_or(&rest);
        if trimmed.is_empty() {
            None
        } else {
            Some(RawChunk(trimmed.to_vec()))
        }
    }
}

/// Turn a byte stream into a frame stream.
///
/// The first transport error is yielded once and ends the stream. Frames are
/// released as soon as their terminating blank line arrives.
pub fn frames<S, B, E>(bytes: S) -> impl Stream<Item = Result<RawChunk, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    struct State<S> {
        bytes: S,
        framer: Framer,
        ready: std::collections::VecDeque<RawChunk>,
        done: bool,
    }

    let state = State {
        bytes,
        framer: Framer::new(),
        ready: std::collections::VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => state.ready.extend(state.framer.push(bytes.as_ref())),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    state.ready.extend(state.framer.finish());
                }
            }
        }
    })
}
