//! Context retrieval
//!
//! Queries the search index for text related to the question and joins the
//! hits into one context blob. Retrieval never fails from the caller's point
//! of view: any problem is logged and yields empty context, so generation
//! proceeds without augmentation.

use crate::config::SearchConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Separator between hit texts in the joined context
pub const HIT_SEPARATOR: &str = "\n\n";

/// Source of supporting text for a question
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Ranked hit texts joined by paragraph boundaries; empty when nothing
    /// matched or the search failed.
    async fn retrieve(&self, query: &str) -> String;
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed search response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Elasticsearch-backed retriever combining a lexical match with an
/// optional semantic clause
pub struct ElasticsearchRetriever {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    index_name: String,
    content_field: String,
    semantic_field: Option<String>,
    semantic_boost: f64,
    size: usize,
}

impl ElasticsearchRetriever {
    pub fn new(config: &SearchConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            content_field: config.content_field.clone(),
            semantic_field: config.semantic_field.clone(),
            semantic_boost: config.semantic_boost,
            size: config.size,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("ApiKey {key}")),
            None => request,
        }
    }

    /// Check that the cluster answers. Used at startup for diagnostics only.
    pub async fn ping(&self) -> Result<(), RetrievalError> {
        let response = self
            .authorize(self.client.get(&self.base_url))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RetrievalError::Status { status, body })
        }
    }

    fn build_query(&self, query: &str) -> Value {
        let mut should = vec![json!({
            "match": { self.content_field.as_str(): { "query": query } }
        })];
        if let Some(field) = &self.semantic_field {
            should.push(json!({
                "semantic": {
                    "field": field,
                    "query": query,
                    "boost": self.semantic_boost
                }
            }));
        }

        json!({
            "size": self.size,
            "query": { "bool": { "should": should } }
        })
    }

    /// Run the search and return hit sources in ranked order
    pub async fn search(&self, query: &str) -> Result<Vec<Value>, RetrievalError> {
        let url = format!("{}/{}/_search", self.base_url, self.index_name);
        let response = self
            .authorize(self.client.post(&url))
            .json(&self.build_query(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RetrievalError::Status { status, body });
        }

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        Ok(parsed.hits.hits.into_iter().map(|hit| hit.source).collect())
    }
}

#[async_trait]
impl ContextRetriever for ElasticsearchRetriever {
    async fn retrieve(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(sources) => {
                let context = join_hits(&sources, &self.content_field);
                tracing::debug!(
                    index = %self.index_name,
                    hits = sources.len(),
                    context_chars = context.len(),
                    "Retrieved context"
                );
                context
            }
            Err(e) => {
                tracing::warn!(
                    index = %self.index_name,
                    error = %e,
                    "Retrieval failed, continuing without context"
                );
                String::new()
            }
        }
    }
}

/// Resolve `field` in a hit source: the literal key first, then a dotted
/// path through nested objects. Multi-valued fields are joined by newlines.
pub fn resolve_field(source: &Value, field: &str) -> Option<String> {
    source.get(field).and_then(field_text).or_else(|| {
        field
            .split('.')
            .try_fold(source, |node, segment| node.get(segment))
            .and_then(field_text)
    })
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        _ => None,
    }
}

/// Join each hit's content field in ranked order. Hits without the field
/// are skipped.
pub fn join_hits(sources: &[Value], field: &str) -> String {
    sources
        .iter()
        .filter_map(|source| resolve_field(source, field))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(HIT_SEPARATOR)
}

// Elasticsearch response types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source", default)]
    source: Value,
}
