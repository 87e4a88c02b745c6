//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use magent_core::{AgentError, Message, ThreadId};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend_connected: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: Message,
    /// `None` when the default thread was used
    pub thread_id: Option<ThreadId>,
}

#[derive(Debug, Serialize)]
pub struct ThreadsResponse {
    pub threads: Vec<ThreadId>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

const fn status_for(error: &AgentError) -> StatusCode {
    match error {
        AgentError::Timeout(_) | AgentError::MaxIterations(_) => StatusCode::GATEWAY_TIMEOUT,
        AgentError::Provider(_) | AgentError::ProviderUnavailable(_) | AgentError::InvalidResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: &AgentError) -> ApiError {
    (
        status_for(error),
        Json(ErrorResponse {
            error: error.user_message(),
            code: error.code().into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_connected = state.agent.provider().health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend_connected,
        tools: state.agent.tools().names().into_iter().map(String::from).collect(),
    })
}

/// Run one conversation turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = state
        .agent
        .invoke(payload.message, payload.thread_id.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Agent error: {}", e);
            api_error(&e)
        })?;

    Ok(Json(ChatResponse {
        message,
        thread_id: payload.thread_id,
    }))
}

/// Ids of every named thread
pub async fn list_threads(State(state): State<AppState>) -> Json<ThreadsResponse> {
    Json(ThreadsResponse {
        threads: state.agent.threads().thread_ids(),
    })
}

/// History of a named thread
pub async fn thread_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Json<Vec<Message>> {
    let thread_id = ThreadId::from_string(thread_id);
    Json(state.agent.all_messages(Some(&thread_id)))
}

/// History of the default thread
pub async fn default_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.agent.all_messages(None))
}
