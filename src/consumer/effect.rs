//! Effects produced by consumer transitions

use super::state::TurnId;

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Close and discard any connection left from a previous exchange
    CloseStaleConnection,

    /// Open the live connection for this exchange
    OpenConnection { turn: TurnId, question: String },

    /// Redraw the turn
    Render { turn: TurnId },

    /// The exchange is over; drop its connection
    ReleaseConnection { turn: TurnId },
}
