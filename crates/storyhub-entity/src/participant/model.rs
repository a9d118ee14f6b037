//! Participant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use storyhub_core::types::id::{SessionId, UserId};

/// Role of a participant inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// The session creator.
    Host,
    /// Anyone else.
    Participant,
}

/// A (session, user) membership row.
///
/// Rows are created on first join and only ever flipped inactive, so
/// identity and colour survive reconnection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    /// Session.
    pub session_id: SessionId,
    /// User.
    pub user_id: UserId,
    /// Display name cached from the credential.
    pub username: String,
    /// Role.
    pub role: ParticipantRole,
    /// Cursor colour, stable for the membership lifetime.
    pub cursor_color: String,
    /// Whether the user currently has a live connection.
    pub is_active: bool,
    /// Last reported cursor position (opaque).
    pub cursor_position: Option<serde_json::Value>,
    /// Last reported drawing tool.
    pub current_tool: Option<String>,
    /// Page the user last navigated to. `None` until the first navigation.
    pub current_page: Option<i32>,
    /// Set when the host removed the user; kicked users cannot rejoin.
    pub kicked_at: Option<DateTime<Utc>>,
    /// First join.
    pub joined_at: DateTime<Utc>,
    /// Last connect or disconnect.
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    /// Creates an active membership row.
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        username: impl Into<String>,
        role: ParticipantRole,
        cursor_color: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            username: username.into(),
            role,
            cursor_color: cursor_color.into(),
            is_active: true,
            cursor_position: None,
            current_tool: None,
            current_page: None,
            kicked_at: None,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Whether this row belongs to the host.
    pub fn is_host(&self) -> bool {
        self.role == ParticipantRole::Host
    }

    /// Whether the host removed this user.
    pub fn is_kicked(&self) -> bool {
        self.kicked_at.is_some()
    }
}
