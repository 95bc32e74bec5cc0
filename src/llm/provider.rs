//! Generation oracle selection

use super::{AnthropicClient, GenerationClient, LlmError, LoggingClient, OpenAiClient};
use crate::config::GenerationConfig;
use std::str::FromStr;
use std::sync::Arc;

/// Supported generation oracles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    /// Any server speaking the `OpenAI` chat completions protocol
    OpenAi,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model_id(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "open_ai" | "openai-compatible" => Ok(Provider::OpenAi),
            _ => Err(()),
        }
    }
}

/// Build the configured generation client, wrapped with logging.
///
/// An API key is required unless a custom base URL points at a server that
/// handles auth itself.
pub fn build_client(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>, LlmError> {
    let api_key = match (&config.api_key, &config.base_url) {
        (Some(key), _) => key.clone(),
        (None, Some(_)) => "implicit".to_string(),
        (None, None) => {
            return Err(LlmError::auth(format!(
                "{} requires {} or LLM_BASE_URL",
                config.provider.display_name(),
                config.provider.api_key_env_var()
            )))
        }
    };

    let inner: Arc<dyn GenerationClient> = match config.provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            config.model_id.clone(),
            config.base_url.as_deref(),
        )?),
        Provider::OpenAi => Arc::new(OpenAiClient::new(
            api_key,
            config.model_id.clone(),
            config.base_url.as_deref(),
        )?),
    };

    Ok(Arc::new(LoggingClient::new(inner)))
}
