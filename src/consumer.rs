//! Stream consumer
//!
//! Client side of the relay: keeps the conversation, opens one live
//! connection per exchange and folds the relayed events into the open turn.
//! All mutation of the conversation goes through the pure [`transition`]
//! function; [`ChatSession`] executes the effects it returns.

mod effect;
pub mod event;
pub mod session;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{ConsumerEvent, StreamSignal};
pub use session::{ChatSession, ConsumerError, Render};
pub use state::{Conversation, ExchangeState, Turn, TurnId};
pub use transition::{transition, TransitionError, GENERIC_FAILURE_NOTICE};
