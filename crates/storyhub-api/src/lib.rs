//! # storyhub-api
//!
//! HTTP surface of StoryHub built on Axum:
//!
//! - `GET /ws/collaborate/{session_id}`: the collaboration WebSocket
//! - `/api/sessions`: the thin lobby used by the surrounding platform
//! - `/api/health`: liveness, store health and realtime metrics

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
