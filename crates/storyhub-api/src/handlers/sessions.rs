//! Session lobby handlers.
//!
//! The surrounding platform drives these; the live editing itself happens
//! over the collaboration socket.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use storyhub_core::types::id::SessionId;

use crate::dto::request::{CreateSessionRequest, JoinSessionRequest, validate_request};
use crate::dto::response::{ApiResponse, SessionListResponse, SessionResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SessionResponse>>)> {
    validate_request(&req)?;
    let session = state
        .engine
        .create_session(auth.user_id, &auth.username, req.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SessionResponse::from(&session))),
    ))
}

/// POST /api/sessions/join
pub async fn join_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<JoinSessionRequest>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    validate_request(&req)?;
    let session = state
        .engine
        .join_by_code(auth.user_id, &auth.username, &req.join_code)
        .await?;
    Ok(Json(ApiResponse::ok(SessionResponse::from(&session))))
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<SessionListResponse>>> {
    let sessions = state.engine.sessions_for_user(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(sessions.into())))
}

/// POST /api/sessions/{session_id}/start
pub async fn start_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<SessionId>,
) -> ApiResult<StatusCode> {
    state.engine.start_session(auth.user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{session_id}/end
pub async fn end_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<SessionId>,
) -> ApiResult<StatusCode> {
    state.engine.end_session(auth.user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
