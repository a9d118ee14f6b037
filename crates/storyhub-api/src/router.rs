//! Route definitions for the StoryHub HTTP API.
//!
//! Lobby and health routes are mounted under `/api`; the collaboration
//! socket lives at `/ws/collaborate/{session_id}`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(session_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route(
        "/ws/collaborate/{session_id}",
        get(handlers::ws::ws_handler),
    );

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Session lobby: create, join, list, start, end
fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route("/sessions/join", post(handlers::sessions::join_session))
        .route(
            "/sessions/{session_id}/start",
            post(handlers::sessions::start_session),
        )
        .route(
            "/sessions/{session_id}/end",
            post(handlers::sessions::end_session),
        )
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
