//! Session lobby: creation, join codes, start and explicit end.

use chrono::Duration;
use tracing::info;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::{SessionId, UserId};
use storyhub_database::{UserSessions, normalize_join_code};
use storyhub_entity::participant::{Participant, ParticipantRole, pick_cursor_color};
use storyhub_entity::session::{CollabSession, NewSession, StoryDraft};

use crate::channel::Audience;
use crate::message::types::OutboundMessage;
use crate::server::CollabEngine;

use super::terminator;

/// Optional seed for a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionSeed {
    pub title: Option<String>,
    pub pages: Vec<String>,
}

impl CollabEngine {
    /// Opens a session hosted by `host`.
    pub async fn create_session(
        &self,
        host: UserId,
        username: &str,
        seed: SessionSeed,
    ) -> AppResult<CollabSession> {
        let title = seed.title.as_deref().map(str::trim).unwrap_or_default();
        if title.chars().count() > self.config.max_title_chars {
            return Err(AppError::validation(format!(
                "Title exceeds {} characters",
                self.config.max_title_chars
            )));
        }
        if seed.pages.len() > self.config.max_pages {
            return Err(AppError::validation(format!(
                "A story holds at most {} pages",
                self.config.max_pages
            )));
        }

        let lifetime = Duration::try_hours(self.config.session_duration_hours)
            .ok_or_else(|| AppError::configuration("Session duration out of range"))?;
        let new = NewSession {
            host_id: host,
            host_username: username.to_string(),
            draft: StoryDraft::seeded(title, seed.pages),
            max_participants: self.config.max_participants,
            lifetime,
        };
        let session = self.store.create_session(new).await?;
        info!(
            session_id = %session.id,
            host_id = %host,
            join_code = %session.join_code,
            "Session created"
        );
        Ok(session)
    }

    /// Registers `user` as a participant of the session behind `code`.
    ///
    /// Joining again is a no-op for existing members.
    pub async fn join_by_code(
        &self,
        user: UserId,
        username: &str,
        code: &str,
    ) -> AppResult<CollabSession> {
        let code = normalize_join_code(code);
        let session = self
            .store
            .find_by_join_code(&code)
            .await?
            .ok_or_else(|| AppError::not_found("No session matches this join code"))?;

        let username = username.to_string();
        let session = self
            .store
            .transact(session.id, move |state| {
                let now = state.now();
                state.session.ensure_active()?;
                if state.session.is_expired(now) {
                    return Err(AppError::session("Session has expired"));
                }
                if let Some(existing) = state.participant(user) {
                    if existing.is_kicked() {
                        return Err(AppError::authorization("You were removed from this session"));
                    }
                    return Ok(state.session.clone());
                }
                if !state.session.is_lobby_open {
                    return Err(AppError::session("The lobby is closed"));
                }
                if state.participants.len() >= state.session.max_participants as usize {
                    return Err(AppError::capacity("Session is full"));
                }

                let color =
                    pick_cursor_color(state.participants.iter().map(|p| p.cursor_color.as_str()));
                let mut row = Participant::new(
                    state.session.id,
                    user,
                    username,
                    ParticipantRole::Participant,
                    color,
                    now,
                );
                row.is_active = false;
                state.upsert_participant(row);
                Ok(state.session.clone())
            })
            .await?;

        info!(session_id = %session.id, user_id = %user, "Participant joined lobby");
        Ok(session)
    }

    /// Closes the lobby; only members can connect afterwards.
    pub async fn start_session(&self, user: UserId, session_id: SessionId) -> AppResult<()> {
        let story_title = self
            .store
            .transact(session_id, move |state| {
                state.session.ensure_active()?;
                if !state.session.is_host(user) {
                    return Err(AppError::authorization("Only the host can start the session"));
                }
                if !state.session.is_lobby_open {
                    return Err(AppError::conflict("Session already started"));
                }
                state.session.is_lobby_open = false;
                Ok(state.session.draft.title.clone())
            })
            .await?;

        info!(session_id = %session_id, "Session started");
        self.broadcaster.broadcast(
            session_id,
            Audience::All,
            &OutboundMessage::SessionStarted {
                session_id,
                story_title,
            },
        );
        Ok(())
    }

    /// Ends the session without creating a story.
    pub async fn end_session(&self, user: UserId, session_id: SessionId) -> AppResult<()> {
        let story_title = self
            .store
            .transact(session_id, move |state| {
                state.session.ensure_active()?;
                if !state.session.is_host(user) {
                    return Err(AppError::authorization("Only the host can end the session"));
                }
                state.session.deactivate();
                Ok(state.session.draft.title.clone())
            })
            .await?;

        terminator::end_session(&self.broadcaster, session_id, story_title, "host");
        Ok(())
    }

    /// Active sessions `user` hosts or participates in.
    pub async fn sessions_for_user(&self, user: UserId) -> AppResult<UserSessions> {
        self.store.sessions_for_user(user).await
    }
}
