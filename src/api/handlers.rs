//! HTTP request handlers

use super::types::{
    AskRequest, AskResponse, ErrorResponse, Message, INVALID_MESSAGES, METHOD_NOT_ALLOWED,
    NO_ANSWER, UPSTREAM_FAILED,
};
use super::AppState;
use crate::llm::{LlmMessage, LlmRequest};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Largest accepted `/api/ask` body. Full-history payloads grow every turn.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(ask).fallback(method_not_allowed))
        .route("/version", get(get_version))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ============================================================
// Exchange
// ============================================================

async fn ask(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AskResponse>, AppError> {
    // Over-limit or unreadable bodies get the same JSON 400 as bad shapes
    let body = body.map_err(|e| {
        tracing::debug!(error = %e, "Failed to read ask body");
        AppError::BadRequest(INVALID_MESSAGES.to_string())
    })?;
    let messages = parse_messages(&body)?;

    let preamble = state.preamble.resolve().await;
    let request = build_request(&preamble, &messages);

    let response = state.llm.complete(&request).await.map_err(|e| {
        tracing::debug!(kind = ?e.kind, "Exchange failed, replying with generic error");
        AppError::Upstream
    })?;

    let result = response.usable_text().unwrap_or(NO_ANSWER).to_string();
    Ok(Json(AskResponse { result }))
}

/// Validate the body as `{ messages: [{role, content}, ...] }`.
fn parse_messages(body: &[u8]) -> Result<Vec<Message>, AppError> {
    serde_json::from_slice::<AskRequest>(body)
        .map(|request| request.messages)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected ask body");
            AppError::BadRequest(INVALID_MESSAGES.to_string())
        })
}

/// Provider request: the preamble as a system message, then the client
/// history untouched and in order.
pub fn build_request(preamble: &str, messages: &[Message]) -> LlmRequest {
    let mut provider_messages = Vec::with_capacity(messages.len() + 1);
    provider_messages.push(LlmMessage::system(preamble));
    provider_messages.extend(messages.iter().map(LlmMessage::from));
    LlmRequest::new(provider_messages)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn get_version() -> &'static str {
    concat!("toyo-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    MethodNotAllowed,
    /// Provider failure; the cause is logged, never returned
    Upstream,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED.to_string())
            }
            AppError::Upstream => {
                (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILED.to_string())
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
