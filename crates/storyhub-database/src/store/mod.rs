//! Session store: sessions, participants, the operation log and finalized
//! stories behind one transactional interface.

pub mod join_code;
pub mod memory;
pub mod postgres;
pub mod state;

use sqlx::PgPool;

use storyhub_core::result::AppResult;
use storyhub_core::types::id::{SessionId, StoryId, UserId};
use storyhub_entity::operation::Operation;
use storyhub_entity::participant::Participant;
use storyhub_entity::session::{CollabSession, NewSession};
use storyhub_entity::story::Story;

pub use self::join_code::{generate_join_code, normalize_join_code};
pub use self::memory::MemoryStore;
pub use self::postgres::PostgresStore;
pub use self::state::SessionState;

/// Maximum sessions returned per list in [`UserSessions`].
pub const SESSION_LIST_LIMIT: usize = 10;

/// Active sessions a user hosts or has joined, newest first.
#[derive(Debug, Clone, Default)]
pub struct UserSessions {
    pub hosted: Vec<CollabSession>,
    pub participated: Vec<CollabSession>,
}

impl UserSessions {
    fn sort_and_truncate(&mut self, limit: usize) {
        for list in [&mut self.hosted, &mut self.participated] {
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list.truncate(limit);
        }
    }
}

/// Backend-dispatching session store.
#[derive(Debug, Clone)]
pub enum SessionStore {
    /// Single-process store.
    Memory(MemoryStore),
    /// Shared PostgreSQL store.
    Postgres(PostgresStore),
}

impl SessionStore {
    /// Creates an empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Wraps a PostgreSQL pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(PostgresStore::new(pool))
    }

    /// Backend name for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Creates a session with a unique join code and the host as first participant.
    pub async fn create_session(&self, new: NewSession) -> AppResult<CollabSession> {
        match self {
            Self::Memory(s) => s.create_session(new).await,
            Self::Postgres(s) => s.create_session(new).await,
        }
    }

    pub async fn find_session(&self, id: SessionId) -> AppResult<Option<CollabSession>> {
        match self {
            Self::Memory(s) => s.find_session(id).await,
            Self::Postgres(s) => s.find_session(id).await,
        }
    }

    /// Looks a session up by an already normalised join code.
    pub async fn find_by_join_code(&self, code: &str) -> AppResult<Option<CollabSession>> {
        match self {
            Self::Memory(s) => s.find_by_join_code(code).await,
            Self::Postgres(s) => s.find_by_join_code(code).await,
        }
    }

    pub async fn participants(&self, id: SessionId) -> AppResult<Vec<Participant>> {
        match self {
            Self::Memory(s) => s.participants(id).await,
            Self::Postgres(s) => s.participants(id).await,
        }
    }

    pub async fn sessions_for_user(&self, user: UserId) -> AppResult<UserSessions> {
        match self {
            Self::Memory(s) => s.sessions_for_user(user).await,
            Self::Postgres(s) => s.sessions_for_user(user).await,
        }
    }

    /// Runs `f` against the locked session and persists its changes
    /// atomically. Nothing is written when `f` fails.
    ///
    /// Returns a `NOT_FOUND` error when the session does not exist.
    pub async fn transact<T, F>(&self, id: SessionId, f: F) -> AppResult<T>
    where
        T: Send,
        F: FnOnce(&mut SessionState) -> AppResult<T> + Send,
    {
        match self {
            Self::Memory(s) => s.transact(id, f).await,
            Self::Postgres(s) => s.transact(id, f).await,
        }
    }

    /// The session's operation log in sequence order.
    pub async fn operations(&self, id: SessionId) -> AppResult<Vec<Operation>> {
        match self {
            Self::Memory(s) => s.operations(id).await,
            Self::Postgres(s) => s.operations(id).await,
        }
    }

    pub async fn find_story(&self, id: StoryId) -> AppResult<Option<Story>> {
        match self {
            Self::Memory(s) => s.find_story(id).await,
            Self::Postgres(s) => s.find_story(id).await,
        }
    }

    /// Drops the operation log of an ended session.
    pub async fn prune_operations(&self, id: SessionId) -> AppResult<u64> {
        match self {
            Self::Memory(s) => s.prune_operations(id).await,
            Self::Postgres(s) => s.prune_operations(id).await,
        }
    }

    pub async fn health_check(&self) -> AppResult<bool> {
        match self {
            Self::Memory(_) => Ok(true),
            Self::Postgres(s) => s.health_check().await,
        }
    }
}
