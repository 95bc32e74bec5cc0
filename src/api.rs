//! HTTP API for the relay
//!
//! One streaming endpoint plus a plain-text health check.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::config::RelayConfig;
use crate::llm::GenerationClient;
use crate::relay::DisconnectPolicy;
use crate::retrieval::ContextRetriever;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub generator: Arc<dyn GenerationClient>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            retriever,
            generator,
        }
    }

    pub fn disconnect_policy(&self) -> DisconnectPolicy {
        if self.config.abort_on_disconnect {
            DisconnectPolicy::Abort
        } else {
            DisconnectPolicy::Drain
        }
    }
}
