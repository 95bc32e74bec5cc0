//! Events driving the consumer state machine

use super::state::TurnId;
use crate::wire::StreamEvent;

/// What a live connection reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    Delta(String),
    Done,
    /// Structured error sent by the relay
    Error(String),
    /// The connection failed or ended without a terminal marker
    TransportFailure,
}

impl From<StreamEvent> for StreamSignal {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Delta { text } => StreamSignal::Delta(text),
            StreamEvent::Error { error } => StreamSignal::Error(error),
            StreamEvent::Done => StreamSignal::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    /// User submitted a question; `turn` identifies the new exchange
    Submit { turn: TurnId, question: String },
    /// A signal from the connection serving `turn`
    Stream { turn: TurnId, signal: StreamSignal },
}
