//! Collaborative session aggregate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::{SessionId, UserId};

use super::autosave::AutosaveState;
use super::canvas::CanvasLayers;
use super::draft::StoryDraft;
use super::vote::VoteState;

/// One live collaborative editing instance of a single story.
///
/// Exactly one host. The session flips inactive when a passed vote is
/// finalized, when the host's reconnection grace elapses, when the host
/// ends it, or when it expires; it never becomes active again after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabSession {
    /// Session id.
    pub id: SessionId,
    /// Short human join code.
    pub join_code: String,
    /// Host user.
    pub host_id: UserId,
    /// Whether editing is still possible.
    pub is_active: bool,
    /// Whether new participants may join.
    pub is_lobby_open: bool,
    /// Distinct participants admitted through the lobby.
    pub max_participants: u32,

    // -- Content --
    /// Authoritative draft.
    pub draft: StoryDraft,
    /// Canvas snapshot and state layers.
    pub canvas: CanvasLayers,
    /// Page the room last navigated to.
    pub current_page: i32,

    // -- Coordination --
    /// Finalize vote.
    pub vote: VoteState,
    /// Auto-save counter and timestamp.
    pub autosave: AutosaveState,
    /// Live connections across all processes.
    pub connection_count: u32,
    /// Next operation sequence number.
    pub next_sequence: i64,
    /// When the host dropped, if the host is currently away.
    pub host_disconnected_at: Option<DateTime<Utc>>,

    // -- Timestamps --
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Hard expiry.
    pub expires_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Host user.
    pub host_id: UserId,
    /// Host display name.
    pub host_username: String,
    /// Seed draft (empty for a fresh story).
    pub draft: StoryDraft,
    /// Distinct participant limit.
    pub max_participants: u32,
    /// Lifetime from now.
    pub lifetime: Duration,
}

impl CollabSession {
    /// Builds a fresh, open session.
    pub fn open(new: &NewSession, join_code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            join_code,
            host_id: new.host_id,
            is_active: true,
            is_lobby_open: true,
            max_participants: new.max_participants,
            draft: new.draft.clone(),
            canvas: CanvasLayers::default(),
            current_page: 0,
            vote: VoteState::default(),
            autosave: AutosaveState::default(),
            connection_count: 0,
            next_sequence: 0,
            host_disconnected_at: None,
            created_at: now,
            expires_at: now + new.lifetime,
            updated_at: now,
        }
    }

    /// Whether `user` hosts this session.
    pub fn is_host(&self, user: UserId) -> bool {
        self.host_id == user
    }

    /// Whether the hard expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the host has been away for at least `grace`.
    pub fn host_grace_elapsed(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.host_disconnected_at
            .is_some_and(|since| now - since >= grace)
    }

    /// Rejects mutations once the session has ended.
    pub fn ensure_active(&self) -> AppResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(AppError::session("Session is no longer active"))
        }
    }

    /// Ends the session for good.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.is_lobby_open = false;
        self.host_disconnected_at = None;
        self.vote.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CollabSession {
        let new = NewSession {
            host_id: UserId::new(),
            host_username: "host".into(),
            draft: StoryDraft::default(),
            max_participants: 10,
            lifetime: Duration::hours(24),
        };
        CollabSession::open(&new, "ABCDE".into(), Utc::now())
    }

    #[test]
    fn test_open_session_defaults() {
        let session = sample();
        assert!(session.is_active);
        assert!(session.is_lobby_open);
        assert_eq!(session.next_sequence, 0);
        assert!(session.draft.pages.is_empty());
    }

    #[test]
    fn test_grace_window() {
        let mut session = sample();
        let now = Utc::now();
        assert!(!session.host_grace_elapsed(now, Duration::minutes(5)));

        session.host_disconnected_at = Some(now - Duration::minutes(4));
        assert!(!session.host_grace_elapsed(now, Duration::minutes(5)));

        session.host_disconnected_at = Some(now - Duration::minutes(6));
        assert!(session.host_grace_elapsed(now, Duration::minutes(5)));
    }

    #[test]
    fn test_deactivate_blocks_mutation() {
        let mut session = sample();
        session.deactivate();
        assert!(session.ensure_active().is_err());
        assert!(!session.is_lobby_open);
    }
}
