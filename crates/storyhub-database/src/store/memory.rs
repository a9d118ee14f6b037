//! Process-local session store.
//!
//! Each session lives behind its own async mutex, so units of work on one
//! session are serialized while different sessions proceed in parallel.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::debug;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::{SessionId, StoryId, UserId};
use storyhub_entity::operation::Operation;
use storyhub_entity::participant::{Participant, ParticipantRole, pick_cursor_color};
use storyhub_entity::session::{CollabSession, NewSession};
use storyhub_entity::story::Story;

use super::join_code::generate_join_code;
use super::state::SessionState;
use super::{SESSION_LIST_LIMIT, UserSessions};

#[derive(Debug)]
struct SessionRecord {
    session: CollabSession,
    participants: Vec<Participant>,
    operations: Vec<Operation>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: DashMap<SessionId, Arc<Mutex<SessionRecord>>>,
    join_codes: DashMap<String, SessionId>,
    stories: DashMap<StoryId, Story>,
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(&self, new: NewSession) -> AppResult<CollabSession> {
        let now = Utc::now();
        let session = loop {
            let code = generate_join_code();
            if let Entry::Vacant(slot) = self.inner.join_codes.entry(code.clone()) {
                let session = CollabSession::open(&new, code, now);
                slot.insert(session.id);
                break session;
            }
        };

        let mut host = Participant::new(
            session.id,
            new.host_id,
            new.host_username,
            ParticipantRole::Host,
            pick_cursor_color([]),
            now,
        );
        host.is_active = false;

        let record = SessionRecord {
            session: session.clone(),
            participants: vec![host],
            operations: Vec::new(),
        };
        self.inner
            .sessions
            .insert(session.id, Arc::new(Mutex::new(record)));

        debug!(session_id = %session.id, join_code = %session.join_code, "Session created");
        Ok(session)
    }

    fn record(&self, id: SessionId) -> Option<Arc<Mutex<SessionRecord>>> {
        self.inner.sessions.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub async fn find_session(&self, id: SessionId) -> AppResult<Option<CollabSession>> {
        match self.record(id) {
            Some(record) => Ok(Some(record.lock().await.session.clone())),
            None => Ok(None),
        }
    }

    pub async fn find_by_join_code(&self, code: &str) -> AppResult<Option<CollabSession>> {
        let id = self.inner.join_codes.get(code).map(|r| *r.value());
        match id {
            Some(id) => self.find_session(id).await,
            None => Ok(None),
        }
    }

    pub async fn participants(&self, id: SessionId) -> AppResult<Vec<Participant>> {
        match self.record(id) {
            Some(record) => Ok(record.lock().await.participants.clone()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn sessions_for_user(&self, user: UserId) -> AppResult<UserSessions> {
        let records: Vec<_> = self
            .inner
            .sessions
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();

        let mut out = UserSessions::default();
        for record in records {
            let record = record.lock().await;
            if !record.session.is_active {
                continue;
            }
            if record.session.is_host(user) {
                out.hosted.push(record.session.clone());
            } else if record.participants.iter().any(|p| p.user_id == user) {
                out.participated.push(record.session.clone());
            }
        }
        out.sort_and_truncate(SESSION_LIST_LIMIT);
        Ok(out)
    }

    pub async fn transact<T, F>(&self, id: SessionId, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut SessionState) -> AppResult<T>,
    {
        let record = self
            .record(id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        let mut record = record.lock().await;

        let mut state = SessionState::new(
            record.session.clone(),
            record.participants.clone(),
            Utc::now(),
        );
        let out = f(&mut state)?;

        let (session, participants, operations, story) = state.into_parts();
        record.session = session;
        record.participants = participants;
        record.operations.extend(operations);
        if let Some(story) = story {
            self.inner.stories.insert(story.id, story);
        }
        Ok(out)
    }

    pub async fn operations(&self, id: SessionId) -> AppResult<Vec<Operation>> {
        match self.record(id) {
            Some(record) => Ok(record.lock().await.operations.clone()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn find_story(&self, id: StoryId) -> AppResult<Option<Story>> {
        Ok(self.inner.stories.get(&id).map(|r| r.value().clone()))
    }

    pub async fn prune_operations(&self, id: SessionId) -> AppResult<u64> {
        let record = self
            .record(id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        let mut record = record.lock().await;
        if record.session.is_active {
            return Err(AppError::conflict("Cannot prune an active session"));
        }
        let removed = record.operations.len() as u64;
        record.operations.clear();
        Ok(removed)
    }
}
