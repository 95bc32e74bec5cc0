//! Relay state machine
//!
//! Pure transitions from upstream generation signals to what goes on the
//! wire. The framing headers go out at most once, a response never switches
//! framing after they have, and every exchange ends with exactly one
//! terminal outcome.

use crate::llm::{LlmError, TextDelta};
use crate::wire::StreamEvent;

/// Client-facing text for a failure after streaming has begun
pub const STREAM_ERROR_MESSAGE: &str = "An error occurred while generating the response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// Nothing sent yet; the response may still become a plain error
    #[default]
    Open,
    /// Event-stream headers sent
    Streaming,
    ClosedOk,
    ClosedError,
}

impl RelayState {
    pub fn is_closed(self) -> bool {
        matches!(self, RelayState::ClosedOk | RelayState::ClosedError)
    }
}

/// Signals from the decoded generation stream
#[derive(Debug, Clone, PartialEq)]
pub enum RelayInput {
    Delta(TextDelta),
    UpstreamError(LlmError),
    UpstreamEnd,
}

/// What the relay writes in response to an input
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutput {
    /// Commit to event-stream framing
    SendHeaders,
    Event(StreamEvent),
    /// Answer with a single non-streamed error instead
    Reject(LlmError),
}

/// Pure transition function
pub fn transition(state: RelayState, input: RelayInput) -> (RelayState, Vec<RelayOutput>) {
    match (state, input) {
        (RelayState::Open, RelayInput::Delta(delta)) => (
            RelayState::Streaming,
            vec![
                RelayOutput::SendHeaders,
                RelayOutput::Event(StreamEvent::delta(delta.text)),
            ],
        ),

        // Generation produced nothing: still a valid, empty stream
        (RelayState::Open, RelayInput::UpstreamEnd) => (
            RelayState::ClosedOk,
            vec![
                RelayOutput::SendHeaders,
                RelayOutput::Event(StreamEvent::Done),
            ],
        ),

        (RelayState::Open, RelayInput::UpstreamError(err)) => {
            (RelayState::ClosedError, vec![RelayOutput::Reject(err)])
        }

        (RelayState::Streaming, RelayInput::Delta(delta)) => (
            RelayState::Streaming,
            vec![RelayOutput::Event(StreamEvent::delta(delta.text))],
        ),

        (RelayState::Streaming, RelayInput::UpstreamError(_)) => (
            RelayState::ClosedError,
            vec![
                RelayOutput::Event(StreamEvent::error(STREAM_ERROR_MESSAGE)),
                RelayOutput::Event(StreamEvent::Done),
            ],
        ),

        (RelayState::Streaming, RelayInput::UpstreamEnd) => (
            RelayState::ClosedOk,
            vec![RelayOutput::Event(StreamEvent::Done)],
        ),

        // Closed is final; late signals and repeated closes are no-ops
        (closed @ (RelayState::ClosedOk | RelayState::ClosedError), _) => (closed, vec![]),
    }
}

/// Holder for one exchange's relay state
#[derive(Debug, Default)]
pub struct Relay {
    state: RelayState,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn feed(&mut self, input: RelayInput) -> Vec<RelayOutput> {
        let (next, outputs) = transition(self.state, input);
        self.state = next;
        outputs
    }

    /// Finish the exchange as if the upstream ended normally
    pub fn close(&mut self) -> Vec<RelayOutput> {
        self.feed(RelayInput::UpstreamEnd)
    }
}
