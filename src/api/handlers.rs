//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ChatQuery, ErrorResponse};
use super::AppState;
use crate::llm::{GenerationRequest, LlmError, LlmErrorKind};
use crate::{prompt, relay};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::Instrument;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/chat", get(chat))
        .with_state(state)
}

async fn health() -> &'static str {
    "RAG relay is running"
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    query: Result<Query<ChatQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return AppError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
                .into_response();
        }
    };
    let Some(question) = query.question() else {
        return AppError::BadRequest("No message provided".to_string()).into_response();
    };

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    match answer(&state, question).instrument(span).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Retrieve, assemble and start relaying one exchange
async fn answer(state: &AppState, question: &str) -> Result<Response, AppError> {
    tracing::info!(question_chars = question.len(), "Chat request");

    let context = state.retriever.retrieve(question).await;
    if context.is_empty() {
        tracing::debug!("No context retrieved");
    }

    let prompt = prompt::assemble(&state.config.prompt_template, &context, question);
    let generation = &state.config.generation;
    let request = GenerationRequest::new(prompt, generation.max_tokens, generation.temperature)
        .map_err(AppError::from_llm)?;

    let chunks = state
        .generator
        .generate(&request)
        .await
        .map_err(AppError::from_llm)?;

    let events = relay::start(chunks, state.generator.decoder(), state.disconnect_policy())
        .await
        .map_err(AppError::from_llm)?;

    Ok(sse_stream(events).into_response())
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    BadGateway(String),
    Unavailable(String),
    Internal(String),
}

impl AppError {
    /// Map a generation failure that happened before any output was sent
    fn from_llm(err: LlmError) -> Self {
        tracing::warn!(error = %err, kind = ?err.kind, "Generation failed before streaming");
        match err.kind {
            LlmErrorKind::RateLimit => {
                AppError::Unavailable("The generation service is busy, try again later".to_string())
            }
            LlmErrorKind::InvalidRequest => {
                AppError::Internal("The generation request was rejected".to_string())
            }
            LlmErrorKind::Network
            | LlmErrorKind::ServerError
            | LlmErrorKind::Auth
            | LlmErrorKind::Unknown => {
                AppError::BadGateway("Failed to generate a response".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
