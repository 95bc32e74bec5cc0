//! Pure consumer transition function
//!
//! The only place that mutates a [`Conversation`]. Given the same
//! conversation, event and clock reading it always produces the same result
//! and performs no I/O.

use super::effect::Effect;
use super::event::{ConsumerEvent, StreamSignal};
use super::state::{Conversation, ExchangeState, Turn, TurnId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Shown when a connection dies without a structured error
pub const GENERIC_FAILURE_NOTICE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("An answer is still streaming, wait for it to finish")]
    ExchangeInFlight,
}

pub fn transition(
    conversation: &mut Conversation,
    event: ConsumerEvent,
    now: DateTime<Utc>,
) -> Result<Vec<Effect>, TransitionError> {
    match event {
        ConsumerEvent::Submit { turn, question } => {
            let question = question.trim();
            if question.is_empty() {
                return Err(TransitionError::EmptyQuestion);
            }
            if conversation.state().is_in_flight() {
                return Err(TransitionError::ExchangeInFlight);
            }

            conversation.push_turn(Turn::new(turn, question, now));
            conversation.set_state(ExchangeState::Streaming { turn });
            Ok(vec![
                Effect::CloseStaleConnection,
                Effect::OpenConnection {
                    turn,
                    question: question.to_string(),
                },
                Effect::Render { turn },
            ])
        }

        ConsumerEvent::Stream { turn, signal } => {
            // Stale connection or already-completed turn
            let Some(open) = conversation.open_turn_mut(turn) else {
                return Ok(vec![]);
            };

            match signal {
                StreamSignal::Delta(text) => {
                    if text.is_empty() {
                        return Ok(vec![]);
                    }
                    open.append(&text);
                    Ok(vec![Effect::Render { turn }])
                }
                StreamSignal::Done => {
                    open.complete(now);
                    conversation.set_state(ExchangeState::Done { turn });
                    Ok(finish(turn))
                }
                StreamSignal::Error(message) => Ok(fail(conversation, turn, message, now)),
                StreamSignal::TransportFailure => Ok(fail(
                    conversation,
                    turn,
                    GENERIC_FAILURE_NOTICE.to_string(),
                    now,
                )),
            }
        }
    }
}

/// Append the failure text to the open turn and complete it
fn fail(
    conversation: &mut Conversation,
    turn: TurnId,
    message: String,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    if let Some(open) = conversation.open_turn_mut(turn) {
        if !open.answer_markdown().is_empty() {
            open.append("\n\n");
        }
        open.append(&message);
        open.complete(now);
    }
    conversation.set_state(ExchangeState::Error { turn, message });
    finish(turn)
}

fn finish(turn: TurnId) -> Vec<Effect> {
    vec![Effect::ReleaseConnection { turn }, Effect::Render { turn }]
}
