//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, SessionResponse, SuccessResponse,
    TranscriptResponse,
};
use super::AppState;
use crate::persona::About;
use crate::session::{SessionError, SessionEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat page
        .route("/", get(serve_page))
        // Static assets (embedded or filesystem fallback)
        .route("/assets/*path", get(serve_static))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_transcript).delete(end_session),
        )
        // Chat
        .route("/api/sessions/:id/chat", post(send_chat))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Branding and model info
        .route("/api/about", get(get_about))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found (expected ui/index.html)</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.sessions.create().await;
    let turns = session.turns().await;

    Json(SessionResponse {
        session_id: session.id.clone(),
        turns,
    })
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    let turns = session.turns().await;
    let agent_working = session.is_busy();

    Ok(Json(TranscriptResponse {
        session_id: id,
        turns,
        agent_working,
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let report = state.sessions.send_message(&id, &req.text).await?;

    Ok(Json(ChatResponse {
        turns: report.turns,
        appended: report.appended,
        operator_error: report.operator_error,
    }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    // Snapshot and subscribe together so the init event and the live
    // events never describe the same turn twice
    let (turns, broadcast_rx) = session.snapshot_and_subscribe().await;
    let agent_working = session.is_busy();

    let init_event = SessionEvent::Init {
        turns,
        agent_working,
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// About / Version
// ============================================================

async fn get_about(State(state): State<AppState>) -> Json<About> {
    Json(About::for_model(state.sessions.model_id()))
}

async fn get_version() -> &'static str {
    concat!("whitebox ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::EmptyMessage => AppError::BadRequest(e.to_string()),
            SessionError::Internal(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
