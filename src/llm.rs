//! Streaming generation oracle abstraction
//!
//! Clients here only transport: they open the oracle's stream and hand back
//! its frames as [`RawChunk`]s. Turning frames into text is the job of the
//! provider's [`ChunkDecoder`].

mod anthropic;
mod decode;
mod error;
mod openai;
mod provider;

#[cfg(test)]
mod proptests;

pub use anthropic::AnthropicClient;
pub use decode::{ChunkDecoder, Record, TextDelta};
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiClient;
pub use provider::{build_client, Provider};

use crate::framing::{self, RawChunk};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Oracle chunks in generation order. A transport failure is the final item.
pub type RawChunkStream = Pin<Box<dyn Stream<Item = Result<RawChunk, LlmError>> + Send>>;

/// One generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Result<Self, LlmError> {
        if max_tokens == 0 {
            return Err(LlmError::invalid_request("max_tokens must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(LlmError::invalid_request(format!(
                "temperature must be within [0, 1], got {temperature}"
            )));
        }
        Ok(Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        })
    }
}

/// Common interface for streaming generation oracles
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Open the oracle stream. Connection and HTTP status failures are
    /// returned here, before any chunk exists.
    async fn generate(&self, request: &GenerationRequest) -> Result<RawChunkStream, LlmError>;

    /// Decoder matching this oracle's chunk format
    fn decoder(&self) -> ChunkDecoder;

    fn model_id(&self) -> &str;
}

/// Send a streaming request and frame the successful response body.
async fn open_stream(request: reqwest::RequestBuilder) -> Result<RawChunkStream, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::from_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read error response: {e}")))?;
        return Err(LlmError::from_status(status, &body));
    }

    let bytes = Box::pin(response.bytes_stream());
    let chunks = framing::frames(bytes).map(|item| item.map_err(|e| LlmError::from_transport(&e)));
    Ok(Box::pin(chunks))
}

/// Logging wrapper for generation clients
pub struct LoggingClient {
    inner: Arc<dyn GenerationClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn GenerationClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl GenerationClient for LoggingClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawChunkStream, LlmError> {
        let start = Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = request.prompt.len(),
                    max_tokens = request.max_tokens,
                    "Generation stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Generation request failed"
                );
            }
        }

        result
    }

    fn decoder(&self) -> ChunkDecoder {
        self.inner.decoder()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
