//! Relay configuration
//!
//! Built once at startup from the environment and shared by reference with
//! every component.

use crate::llm::Provider;
use crate::prompt::DEFAULT_TEMPLATE;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CONTENT_FIELD: &str = "content";
pub const DEFAULT_SEMANTIC_FIELD: &str = "semantic_content";
pub const DEFAULT_INDEX_NAME: &str = "knowledge_base";
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRIEVAL_SIZE: usize = 3;
pub const DEFAULT_SEMANTIC_BOOST: f64 = 1.0;
pub const DEFAULT_PORT: u16 = 5000;

/// Search index connection and query shape
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub index_name: String,
    pub content_field: String,
    /// `None` disables the semantic match clause
    pub semantic_field: Option<String>,
    pub semantic_boost: f64,
    pub size: usize,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

/// Generation oracle selection and sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    /// Overrides the provider's public endpoint (gateways, local servers)
    pub base_url: Option<String>,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Top-level configuration for the relay server
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub prompt_template: String,
    pub search: SearchConfig,
    pub generation: GenerationConfig,
    /// Stop reading the upstream stream as soon as the consumer disconnects
    pub abort_on_disconnect: bool,
    pub port: u16,
    pub cors_origin: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to their
    /// defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let provider = match lookup("LLM_PROVIDER") {
            Some(name) => Provider::from_str(&name).unwrap_or_else(|()| {
                tracing::warn!(value = %name, "Unknown LLM_PROVIDER, using anthropic");
                Provider::Anthropic
            }),
            None => Provider::Anthropic,
        };

        let max_tokens = parse_or(&lookup, "RAG_MAX_TOKENS", DEFAULT_MAX_TOKENS, |v| *v > 0);
        let temperature = parse_or(&lookup, "RAG_TEMPERATURE", DEFAULT_TEMPERATURE, |v| {
            (0.0..=1.0).contains(v)
        });

        let semantic_field = match lookup("ELASTICSEARCH_SEMANTIC_FIELD") {
            Some(field) if field.trim().is_empty() => None,
            Some(field) => Some(field),
            None => Some(DEFAULT_SEMANTIC_FIELD.to_string()),
        };

        let search = SearchConfig {
            url: lookup("ELASTICSEARCH_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            api_key: lookup("ELASTICSEARCH_API_KEY").filter(|k| !k.is_empty()),
            index_name: lookup("ELASTICSEARCH_INDEX")
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            content_field: lookup("ELASTICSEARCH_CONTENT_FIELD")
                .unwrap_or_else(|| DEFAULT_CONTENT_FIELD.to_string()),
            semantic_field,
            semantic_boost: parse_or(&lookup, "RAG_SEMANTIC_BOOST", DEFAULT_SEMANTIC_BOOST, |b| {
                *b >= 0.0
            }),
            size: parse_or(&lookup, "RAG_RETRIEVAL_SIZE", DEFAULT_RETRIEVAL_SIZE, |n| *n > 0),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "RAG_RETRIEVAL_TIMEOUT_SECS",
                DEFAULT_RETRIEVAL_TIMEOUT.as_secs(),
                |s| *s > 0,
            )),
            accept_invalid_certs: parse_flag(&lookup, "ELASTICSEARCH_INSECURE_TLS"),
        };

        let generation = GenerationConfig {
            provider,
            api_key: lookup(provider.api_key_env_var()).filter(|k| !k.is_empty()),
            base_url: lookup("LLM_BASE_URL").filter(|u| !u.is_empty()),
            model_id: lookup("RAG_MODEL_ID")
                .unwrap_or_else(|| provider.default_model_id().to_string()),
            max_tokens,
            temperature,
        };

        let port = lookup("RAG_RELAY_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            prompt_template: lookup("RAG_PROMPT_TEMPLATE")
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            search,
            generation,
            abort_on_disconnect: parse_flag(&lookup, "RAG_ABORT_ON_DISCONNECT"),
            port,
            cors_origin: lookup("RAG_CORS_ORIGIN").filter(|o| !o.is_empty()),
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "Invalid config value, using default");
            default
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}
