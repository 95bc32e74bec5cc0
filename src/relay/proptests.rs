//! Property-based tests for the relay state machine
//!
//! Whatever the upstream does, an exchange ends in exactly one terminal
//! outcome and nothing is written after it.

use super::state::*;
use crate::llm::{LlmError, TextDelta};
use crate::wire::StreamEvent;
use proptest::prelude::*;

fn arb_input() -> impl Strategy<Value = RelayInput> {
    prop_oneof![
        6 => "[a-zA-Z ]{1,10}".prop_map(|t| RelayInput::Delta(TextDelta::new(t))),
        1 => Just(RelayInput::UpstreamError(LlmError::network("reset"))),
        1 => Just(RelayInput::UpstreamEnd),
    ]
}

/// Feed every input, then close, collecting all outputs in order
fn run(inputs: Vec<RelayInput>) -> (Vec<RelayOutput>, RelayState) {
    let mut relay = Relay::new();
    let mut outputs = Vec::new();
    for input in inputs {
        outputs.extend(relay.feed(input));
    }
    outputs.extend(relay.close());
    outputs.extend(relay.close());
    (outputs, relay.state())
}

proptest! {
    #[test]
    fn prop_exactly_one_terminal_outcome(
        inputs in proptest::collection::vec(arb_input(), 0..30)
    ) {
        let (outputs, state) = run(inputs);
        prop_assert!(state.is_closed());

        let rejects = outputs.iter().filter(|o| matches!(o, RelayOutput::Reject(_))).count();
        let dones = outputs
            .iter()
            .filter(|o| matches!(o, RelayOutput::Event(StreamEvent::Done)))
            .count();
        prop_assert_eq!(rejects + dones, 1);

        if rejects == 1 {
            // A rejected exchange writes nothing else
            prop_assert_eq!(outputs.len(), 1);
            prop_assert_eq!(state, RelayState::ClosedError);
        } else {
            prop_assert_eq!(outputs.last(), Some(&RelayOutput::Event(StreamEvent::Done)));
        }
    }

    #[test]
    fn prop_headers_sent_at_most_once_and_first(
        inputs in proptest::collection::vec(arb_input(), 0..30)
    ) {
        let (outputs, _) = run(inputs);
        let headers: Vec<usize> = outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, RelayOutput::SendHeaders))
            .map(|(i, _)| i)
            .collect();
        prop_assert!(headers.len() <= 1);
        if let Some(&at) = headers.first() {
            prop_assert_eq!(at, 0);
        }
    }

    #[test]
    fn prop_deltas_relayed_in_order_until_terminal(
        inputs in proptest::collection::vec(arb_input(), 0..30)
    ) {
        let expected: Vec<String> = inputs
            .iter()
            .take_while(|i| matches!(i, RelayInput::Delta(_)))
            .filter_map(|i| match i {
                RelayInput::Delta(d) => Some(d.text.clone()),
                _ => None,
            })
            .collect();

        let (outputs, _) = run(inputs);
        let relayed: Vec<String> = outputs
            .iter()
            .filter_map(|o| match o {
                RelayOutput::Event(StreamEvent::Delta { text }) => Some(text.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(relayed, expected);
    }

    #[test]
    fn prop_error_event_only_directly_before_done(
        inputs in proptest::collection::vec(arb_input(), 0..30)
    ) {
        let (outputs, _) = run(inputs);
        for (i, output) in outputs.iter().enumerate() {
            if matches!(output, RelayOutput::Event(StreamEvent::Error { .. })) {
                prop_assert_eq!(outputs.get(i + 1), Some(&RelayOutput::Event(StreamEvent::Done)));
            }
        }
    }
}
