//! `OpenAI`-compatible chat completions streaming provider
//!
//! Also covers gateways and local servers that speak the same protocol.

use super::decode::{Record, TextDelta};
use super::{open_stream, ChunkDecoder, GenerationClient, GenerationRequest, LlmError, RawChunkStream};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DONE_SENTINEL: &str = "[DONE]";

/// `OpenAI`-compatible streaming client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model_id: String, base_url: Option<&str>) -> Result<Self, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
        );

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url,
            model_id,
        })
    }

    fn translate_request<'a>(&'a self, request: &'a GenerationRequest) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.model_id,
            messages: vec![OpenAiMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawChunkStream, LlmError> {
        let body = self.translate_request(request);
        let builder = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body);
        open_stream(builder).await
    }

    fn decoder(&self) -> ChunkDecoder {
        ChunkDecoder::OpenAi
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Classify one `data:` payload from the chat completions stream
pub(super) fn decode_record(data: &str) -> Result<Record, serde_json::Error> {
    if data.trim() == DONE_SENTINEL {
        return Ok(Record::Stop);
    }

    let record: OpenAiStreamRecord = serde_json::from_str(data)?;
    if let Some(error) = record.error {
        return Ok(Record::OracleError(error.message));
    }

    let content = record
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content);
    Ok(match content {
        Some(text) => Record::Delta(TextDelta::new(text)),
        None => Record::Ignored,
    })
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamRecord {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    error: Option<OpenAiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}
