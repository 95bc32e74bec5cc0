//! RAG relay server
//!
//! Serves the streaming chat endpoint backed by a search index and a
//! generation oracle.

use rag_relay::api::{create_router, AppState};
use rag_relay::config::RelayConfig;
use rag_relay::llm::build_client;
use rag_relay::retrieval::{ContextRetriever, ElasticsearchRetriever};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = RelayConfig::from_env();

    // Generation oracle
    let generator = build_client(&config.generation)?;
    tracing::info!(
        provider = config.generation.provider.display_name(),
        model = %generator.model_id(),
        max_tokens = config.generation.max_tokens,
        temperature = config.generation.temperature,
        "Generation client initialized"
    );

    // Search index; unreachable is only a warning, requests degrade to no context
    let retriever = ElasticsearchRetriever::new(&config.search)?;
    match retriever.ping().await {
        Ok(()) => tracing::info!(
            url = %config.search.url,
            index = %config.search.index_name,
            "Connected to search cluster"
        ),
        Err(e) => tracing::warn!(
            url = %config.search.url,
            error = %e,
            "Search cluster unreachable, answers will have no retrieved context"
        ),
    }
    let retriever: Arc<dyn ContextRetriever> = Arc::new(retriever);

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // Event streams are not compressed, so deltas are flushed as they arrive
    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let port = config.port;
    let state = AppState::new(config, retriever, generator);
    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("RAG relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
