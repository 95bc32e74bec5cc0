//! Mock implementations for testing
//!
//! These mocks let the relay pipeline run end to end without a search
//! cluster or a generation oracle.

use crate::framing::RawChunk;
use crate::llm::{ChunkDecoder, GenerationClient, GenerationRequest, LlmError, RawChunkStream};
use crate::retrieval::ContextRetriever;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// An Anthropic `content_block_delta` frame carrying `text`
pub fn anthropic_delta_chunk(text: &str) -> RawChunk {
    let payload = serde_json::json!({
        "type": "content_block_delta",
        "index": 0,
        "delta": { "type": "text_delta", "text": text }
    });
    RawChunk::new(format!("event: content_block_delta\ndata: {payload}"))
}

pub fn chunk_stream(items: Vec<Result<RawChunk, LlmError>>) -> RawChunkStream {
    Box::pin(futures::stream::iter(items))
}

// ============================================================================
// Mock Retriever
// ============================================================================

/// Retriever returning a fixed context and recording queries
#[allow(dead_code)]
pub struct MockRetriever {
    context: String,
    pub queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockRetriever {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextRetriever for MockRetriever {
    async fn retrieve(&self, query: &str) -> String {
        self.queries.lock().unwrap().push(query.to_string());
        self.context.clone()
    }
}

// ============================================================================
// Mock Generation Client
// ============================================================================

/// Generation client replaying queued chunk scripts
#[allow(dead_code)]
pub struct MockGenerationClient {
    scripts: Mutex<VecDeque<Result<Vec<Result<RawChunk, LlmError>>, LlmError>>>,
    decoder: ChunkDecoder,
    /// Record of all requests made
    pub requests: Mutex<Vec<GenerationRequest>>,
}

#[allow(dead_code)]
impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            decoder: ChunkDecoder::Anthropic,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue the chunks of one successful stream
    pub fn queue_stream(&self, chunks: Vec<Result<RawChunk, LlmError>>) {
        self.scripts.lock().unwrap().push_back(Ok(chunks));
    }

    /// Queue a stream of Anthropic text deltas
    pub fn queue_deltas(&self, deltas: &[&str]) {
        self.queue_stream(
            deltas
                .iter()
                .map(|text| Ok(anthropic_delta_chunk(text)))
                .collect(),
        );
    }

    /// Queue a failure to open the stream
    pub fn queue_error(&self, error: LlmError) {
        self.scripts.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawChunkStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock stream queued")))?;
        Ok(chunk_stream(script))
    }

    fn decoder(&self) -> ChunkDecoder {
        self.decoder
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
