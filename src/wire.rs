//! Relay wire format
//!
//! Every event is one `data: <payload>\n\n` frame. The payload is
//! `{"text": ...}` for a delta, `{"error": ...}` for a failure, or the
//! literal `[DONE]` terminal marker.

use serde::{Deserialize, Serialize};

pub const DONE_MARKER: &str = "[DONE]";

/// One unit sent from the relay to a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta { text: String },
    Error { error: String },
    Done,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Payload {
    Delta { text: String },
    Error { error: String },
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        StreamEvent::Delta { text: text.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: error.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }

    /// The `data:` payload for this event
    pub fn to_data(&self) -> String {
        let payload = match self {
            StreamEvent::Delta { text } => Payload::Delta { text: text.clone() },
            StreamEvent::Error { error } => Payload::Error {
                error: error.clone(),
            },
            StreamEvent::Done => return DONE_MARKER.to_string(),
        };
        // Serializing a struct of strings cannot fail
        serde_json::to_string(&payload).unwrap_or_default()
    }

    /// Parse a `data:` payload received from the relay
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        if data.trim() == DONE_MARKER {
            return Ok(StreamEvent::Done);
        }
        Ok(match serde_json::from_str(data)? {
            Payload::Delta { text } => StreamEvent::Delta { text },
            Payload::Error { error } => StreamEvent::Error { error },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        assert_eq!(StreamEvent::delta("Elastic").to_data(), r#"{"text":"Elastic"}"#);
        assert_eq!(StreamEvent::error("boom").to_data(), r#"{"error":"boom"}"#);
        assert_eq!(StreamEvent::Done.to_data(), "[DONE]");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            StreamEvent::parse(r#"{"text":"a \"quoted\"\nline"}"#).unwrap(),
            StreamEvent::delta("a \"quoted\"\nline")
        );
        assert_eq!(
            StreamEvent::parse(r#"{"error":"An error occurred"}"#).unwrap(),
            StreamEvent::error("An error occurred")
        );
        assert_eq!(StreamEvent::parse("[DONE]").unwrap(), StreamEvent::Done);
        assert!(StreamEvent::parse(r#"{"text":"trunc"#).is_err());
        assert!(StreamEvent::parse(r#"{"other":1}"#).is_err());
    }

    #[test]
    fn test_payload_never_contains_raw_newline() {
        let data = StreamEvent::delta("one\n\ntwo").to_data();
        assert!(!data.contains('\n'));
    }
}
