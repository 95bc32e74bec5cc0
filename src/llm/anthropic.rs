//! Anthropic Messages streaming provider

use super::decode::{Record, TextDelta};
use super::{open_stream, ChunkDecoder, GenerationClient, GenerationRequest, LlmError, RawChunkStream};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic streaming client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model_id: String, base_url: Option<&str>) -> Result<Self, LlmError> {
        let url = format!(
            "{}/v1/messages",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
        );

        // No overall timeout: a stream lasts as long as the oracle keeps generating
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

    fn translate_request<'a>(&'a self, request: &'a GenerationRequest) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model: &self.model_id,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        }
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawChunkStream, LlmError> {
        let body = self.translate_request(request);
        let builder = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);
        open_stream(builder).await
    }

    fn decoder(&self) -> ChunkDecoder {
        ChunkDecoder::Anthropic
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Classify one `data:` payload from the Messages stream
pub(super) fn decode_record(data: &str) -> Result<Record, serde_json::Error> {
    let record: AnthropicStreamRecord = serde_json::from_str(data)?;
    Ok(match record {
        AnthropicStreamRecord::ContentBlockDelta {
            delta: AnthropicDelta::TextDelta { text },
        } => Record::Delta(TextDelta::new(text)),
        AnthropicStreamRecord::Error { error } => {
            Record::OracleError(format!("{}: {}", error.r#type, error.message))
        }
        AnthropicStreamRecord::MessageStop => Record::Stop,
        AnthropicStreamRecord::ContentBlockDelta { .. } | AnthropicStreamRecord::Other => {
            Record::Ignored
        }
    })
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamRecord {
    ContentBlockDelta { delta: AnthropicDelta },
    MessageStop,
    Error { error: AnthropicErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(default)]
    r#type: String,
    message: String,
}
