//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storyhub_core::types::id::{SessionId, UserId};
use storyhub_database::UserSessions;
use storyhub_entity::session::CollabSession;
use storyhub_realtime::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Lobby view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub join_code: String,
    pub host_id: UserId,
    pub title: String,
    pub page_count: usize,
    pub is_active: bool,
    pub is_lobby_open: bool,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&CollabSession> for SessionResponse {
    fn from(s: &CollabSession) -> Self {
        Self {
            session_id: s.id,
            join_code: s.join_code.clone(),
            host_id: s.host_id,
            title: s.draft.title.clone(),
            page_count: s.draft.pages.len(),
            is_active: s.is_active,
            is_lobby_open: s.is_lobby_open,
            max_participants: s.max_participants,
            created_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}

/// Sessions a user hosts or has joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub hosted: Vec<SessionResponse>,
    pub participated: Vec<SessionResponse>,
}

impl From<UserSessions> for SessionListResponse {
    fn from(sessions: UserSessions) -> Self {
        Self {
            hosted: sessions.hosted.iter().map(SessionResponse::from).collect(),
            participated: sessions
                .participated
                .iter()
                .map(SessionResponse::from)
                .collect(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Store backend name.
    pub store: String,
    pub store_healthy: bool,
    /// Sockets open on this process.
    pub ws_connections: usize,
    pub realtime: MetricsSnapshot,
}
