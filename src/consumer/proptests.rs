//! Property-based tests for the consumer state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::effect::Effect;
use super::event::{ConsumerEvent, StreamSignal};
use super::state::*;
use super::transition::*;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_delta() -> impl Strategy<Value = String> {
    "[a-zA-Z .,!?\n]{0,12}"
}

fn arb_signal() -> impl Strategy<Value = StreamSignal> {
    prop_oneof![
        8 => arb_delta().prop_map(StreamSignal::Delta),
        1 => Just(StreamSignal::Done),
        1 => "[a-z ]{1,20}".prop_map(StreamSignal::Error),
        1 => Just(StreamSignal::TransportFailure),
    ]
}

fn open(conversation: &mut Conversation, question: &str) -> TurnId {
    let turn = TurnId::new();
    transition(
        conversation,
        ConsumerEvent::Submit {
            turn,
            question: question.to_string(),
        },
        Utc::now(),
    )
    .unwrap();
    turn
}

fn feed(conversation: &mut Conversation, turn: TurnId, signal: StreamSignal) -> Vec<Effect> {
    transition(conversation, ConsumerEvent::Stream { turn, signal }, Utc::now()).unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_answer_is_concatenation_of_deltas(
        deltas in proptest::collection::vec(arb_delta(), 0..40)
    ) {
        let mut conversation = Conversation::new();
        let turn = open(&mut conversation, "question");

        for delta in &deltas {
            feed(&mut conversation, turn, StreamSignal::Delta(delta.clone()));
            // Invariant holds while the turn is still open
            let partial = conversation.last_turn().unwrap();
            prop_assert!(!partial.is_complete());
        }
        feed(&mut conversation, turn, StreamSignal::Done);

        let last = conversation.last_turn().unwrap();
        prop_assert!(last.is_complete());
        prop_assert_eq!(last.answer_markdown(), deltas.concat());
    }

    #[test]
    fn prop_exactly_one_release_per_exchange(
        signals in proptest::collection::vec(arb_signal(), 1..40)
    ) {
        let mut conversation = Conversation::new();
        let turn = open(&mut conversation, "question");

        let mut releases = 0;
        let mut frozen: Option<String> = None;
        for signal in signals.iter().cloned() {
            let effects = feed(&mut conversation, turn, signal);
            releases += effects
                .iter()
                .filter(|e| matches!(e, Effect::ReleaseConnection { .. }))
                .count();

            let last = conversation.last_turn().unwrap();
            if let Some(answer) = &frozen {
                // Never mutated after completion
                prop_assert_eq!(last.answer_markdown(), answer.as_str());
            } else if last.is_complete() {
                frozen = Some(last.answer_markdown().to_string());
            }
        }

        let terminated = signals
            .iter()
            .any(|s| !matches!(s, StreamSignal::Delta(_)));
        prop_assert_eq!(releases, usize::from(terminated));
        prop_assert_eq!(conversation.can_submit(), terminated);
    }

    #[test]
    fn prop_submit_rejected_while_incomplete(
        deltas in proptest::collection::vec(arb_delta(), 0..10),
        question in "[a-z]{1,10}"
    ) {
        let mut conversation = Conversation::new();
        let turn = open(&mut conversation, "first");
        for delta in deltas {
            feed(&mut conversation, turn, StreamSignal::Delta(delta));
        }

        let result = transition(
            &mut conversation,
            ConsumerEvent::Submit { turn: TurnId::new(), question },
            Utc::now(),
        );
        prop_assert_eq!(result, Err(TransitionError::ExchangeInFlight));
        prop_assert_eq!(conversation.turns().len(), 1);
    }

    #[test]
    fn prop_stale_signals_never_touch_other_turns(
        old_signals in proptest::collection::vec(arb_signal(), 0..20),
        new_deltas in proptest::collection::vec(arb_delta(), 0..20)
    ) {
        let mut conversation = Conversation::new();
        let old = open(&mut conversation, "old");
        feed(&mut conversation, old, StreamSignal::TransportFailure);
        let new = open(&mut conversation, "new");

        // Interleave late signals from the abandoned connection
        let mut old_iter = old_signals.into_iter();
        for delta in &new_deltas {
            if let Some(signal) = old_iter.next() {
                prop_assert!(feed(&mut conversation, old, signal).is_empty());
            }
            feed(&mut conversation, new, StreamSignal::Delta(delta.clone()));
        }

        prop_assert_eq!(conversation.turns()[0].answer_markdown(), GENERIC_FAILURE_NOTICE);
        prop_assert_eq!(conversation.turns()[1].answer_markdown(), new_deltas.concat());
    }
}
