//! Chunk decoding
//!
//! Each oracle chunk decodes to zero or one text delta. A chunk that cannot
//! be decoded is logged and skipped; it never ends the stream.

use super::{anthropic, openai};
use crate::framing::RawChunk;
use thiserror::Error;

/// One incremental fragment of model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub text: String,
}

impl TextDelta {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// What a single chunk meant to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Incremental content
    Delta(TextDelta),
    /// The oracle reported a failure inside its own stream
    OracleError(String),
    /// The oracle signalled the end of generation
    Stop,
    /// Anything else, including chunks that failed to decode
    Ignored,
}

/// Per-oracle chunk decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDecoder {
    Anthropic,
    OpenAi,
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error("chunk is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("chunk payload is not a recognized record: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ChunkDecoder {
    /// Extract the text delta carried by `chunk`, if any.
    pub fn decode(self, chunk: &RawChunk) -> Option<TextDelta> {
        match self.decode_record(chunk) {
            Record::Delta(delta) => Some(delta),
            _ => None,
        }
    }

    /// Classify `chunk`. Decoding failures are logged and reported as
    /// [`Record::Ignored`].
    pub fn decode_record(self, chunk: &RawChunk) -> Record {
        match self.try_decode(chunk) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    decoder = ?self,
                    error = %e,
                    chunk_bytes = chunk.as_bytes().len(),
                    "Skipping malformed chunk"
                );
                Record::Ignored
            }
        }
    }

    fn try_decode(self, chunk: &RawChunk) -> Result<Record, DecodeError> {
        let Some(data) = chunk.data()? else {
            return Ok(Record::Ignored);
        };
        let record = match self {
            ChunkDecoder::Anthropic => anthropic::decode_record(&data)?,
            ChunkDecoder::OpenAi => openai::decode_record(&data)?,
        };
        Ok(match record {
            Record::Delta(delta) if delta.text.is_empty() => Record::Ignored,
            other => other,
        })
    }
}
