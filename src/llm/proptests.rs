//! Property-based tests for oracle framing and chunk decoding
//!
//! These tests verify that, however the oracle's bytes are split across
//! network reads and wherever malformed frames appear, the decoded deltas
//! are exactly the valid ones in their original order.

use super::decode::{ChunkDecoder, Record};
use crate::framing::Framer;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Frame {
    Delta(String),
    Truncated(String),
    Garbage(String),
    Ping,
}

impl Frame {
    fn encode_anthropic(&self) -> String {
        match self {
            Frame::Delta(text) => {
                let payload = serde_json::json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": { "type": "text_delta", "text": text }
                });
                format!("event: content_block_delta\ndata: {payload}\n\n")
            }
            Frame::Truncated(text) => {
                let payload = serde_json::json!({
                    "type": "content_block_delta",
                    "delta": { "type": "text_delta", "text": text }
                })
                .to_string();
                let cut: String = payload.chars().take(payload.chars().count() / 2).collect();
                format!("event: content_block_delta\ndata: {cut}\n\n")
            }
            Frame::Garbage(junk) => format!("data: {junk}\n\n"),
            Frame::Ping => "event: ping\ndata: {\"type\": \"ping\"}\n\n".to_string(),
        }
    }

    fn encode_openai(&self) -> String {
        match self {
            Frame::Delta(text) => {
                let payload = serde_json::json!({
                    "choices": [{ "index": 0, "delta": { "content": text } }]
                });
                format!("data: {payload}\n\n")
            }
            Frame::Truncated(text) => {
                let payload = serde_json::json!({
                    "choices": [{ "delta": { "content": text } }]
                })
                .to_string();
                let cut: String = payload.chars().take(payload.chars().count() / 2).collect();
                format!("data: {cut}\n\n")
            }
            Frame::Garbage(junk) => format!("data: {junk}\n\n"),
            Frame::Ping => ": keep-alive\n\n".to_string(),
        }
    }
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?]{1,20}",
        "[a-zé漢字 ]{1,10}",
    ]
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    prop_oneof![
        4 => arb_text().prop_map(Frame::Delta),
        1 => arb_text().prop_map(Frame::Truncated),
        1 => "[a-z{}\\[\\]:]{1,15}".prop_map(Frame::Garbage),
        1 => Just(Frame::Ping),
    ]
}

fn expected_text(frames: &[Frame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Delta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Feed `bytes` to a framer in pieces cut at `cuts`, decoding every frame
fn decode_split(decoder: ChunkDecoder, bytes: &[u8], cuts: &[usize]) -> (String, usize) {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.push(0);
    points.push(bytes.len());
    points.sort_unstable();
    points.dedup();

    let mut framer = Framer::new();
    let mut chunks = Vec::new();
    for window in points.windows(2) {
        chunks.extend(framer.push(&bytes[window[0]..window[1]]));
    }
    chunks.extend(framer.finish());

    let mut answer = String::new();
    let mut deltas = 0;
    for chunk in &chunks {
        match decoder.decode_record(chunk) {
            Record::Delta(delta) => {
                answer.push_str(&delta.text);
                deltas += 1;
            }
            Record::OracleError(e) => panic!("unexpected oracle error: {e}"),
            Record::Stop | Record::Ignored => {}
        }
    }
    (answer, deltas)
}

proptest! {
    #[test]
    fn prop_anthropic_deltas_survive_splits_and_noise(
        frames in proptest::collection::vec(arb_frame(), 0..20),
        cuts in proptest::collection::vec(any::<usize>(), 0..10),
    ) {
        let wire: String = frames.iter().map(Frame::encode_anthropic).collect();
        let (answer, deltas) = decode_split(ChunkDecoder::Anthropic, wire.as_bytes(), &cuts);

        let valid = frames.iter().filter(|f| matches!(f, Frame::Delta(_))).count();
        prop_assert_eq!(deltas, valid);
        prop_assert_eq!(answer, expected_text(&frames));
    }

    #[test]
    fn prop_openai_deltas_survive_splits_and_noise(
        frames in proptest::collection::vec(arb_frame(), 0..20),
        cuts in proptest::collection::vec(any::<usize>(), 0..10),
    ) {
        let wire: String = frames.iter().map(Frame::encode_openai).collect();
        let (answer, _) = decode_split(ChunkDecoder::OpenAi, wire.as_bytes(), &cuts);
        prop_assert_eq!(answer, expected_text(&frames));
    }

    #[test]
    fn prop_decode_never_panics_on_arbitrary_bytes(
        bytes in proptest::collection::vec(any::<u8>(), 0..200),
    ) {
        let chunk = crate::framing::RawChunk::new(bytes);
        let _ = ChunkDecoder::Anthropic.decode(&chunk);
        let _ = ChunkDecoder::OpenAi.decode(&chunk);
    }
}
