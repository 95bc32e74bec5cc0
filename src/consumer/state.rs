//! Conversation and exchange state

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Identity of one exchange, used to tell live events from stale ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One question and its (possibly still growing) answer
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    id: TurnId,
    question: String,
    answer_markdown: String,
    is_complete: bool,
    asked_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub(super) fn new(id: TurnId, question: impl Into<String>, asked_at: DateTime<Utc>) -> Self {
        Self {
            id,
            question: question.into(),
            answer_markdown: String::new(),
            is_complete: false,
            asked_at,
            completed_at: None,
        }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer_markdown(&self) -> &str {
        &self.answer_markdown
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn asked_at(&self) -> DateTime<Utc> {
        self.asked_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Time from submission to completion
    pub fn latency(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.asked_at)
    }

    /// No-op once the turn is complete
    pub(super) fn append(&mut self, text: &str) {
        if !self.is_complete {
            self.answer_markdown.push_str(text);
        }
    }

    pub(super) fn complete(&mut self, at: DateTime<Utc>) {
        if !self.is_complete {
            self.is_complete = true;
            self.completed_at = Some(at);
        }
    }
}

/// Where the current exchange stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    /// A connection is open and feeding this turn
    Streaming { turn: TurnId },
    Done { turn: TurnId },
    Error { turn: TurnId, message: String },
}

impl ExchangeState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ExchangeState::Streaming { .. })
    }

    /// The turn currently accepting deltas
    pub fn open_turn(&self) -> Option<TurnId> {
        match self {
            ExchangeState::Streaming { turn } => Some(*turn),
            _ => None,
        }
    }
}

/// Ordered, append-only sequence of turns for one session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    state: ExchangeState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.id == id)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    /// Input is accepted only when no exchange is in flight
    pub fn can_submit(&self) -> bool {
        !self.state.is_in_flight()
    }

    pub(super) fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(super) fn set_state(&mut self, state: ExchangeState) {
        self.state = state;
    }

    /// The last turn, if it is the open one
    pub(super) fn open_turn_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        if self.state.open_turn() != Some(id) {
            return None;
        }
        self.turns
            .last_mut()
            .filter(|turn| turn.id == id && !turn.is_complete)
    }
}
