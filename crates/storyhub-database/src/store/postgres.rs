//! PostgreSQL session store.
//!
//! A unit of work is one database transaction holding a row lock on the
//! session (`SELECT ... FOR UPDATE`), which serializes writers across every
//! server process.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use storyhub_core::error::{AppError, ErrorKind};
use storyhub_core::result::AppResult;
use storyhub_core::types::id::{SessionId, StoryId, UserId};
use storyhub_entity::operation::Operation;
use storyhub_entity::participant::{Participant, ParticipantRole, pick_cursor_color};
use storyhub_entity::session::{
    AutosaveState, CanvasLayers, CollabSession, NewSession, StoryDraft, VoteState,
};
use storyhub_entity::story::{Story, StoryPage};

use super::join_code::generate_join_code;
use super::state::SessionState;
use super::{SESSION_LIST_LIMIT, UserSessions};

const JOIN_CODE_ATTEMPTS: usize = 16;

#[derive(Debug, FromRow)]
struct SessionRow {
    id: SessionId,
    join_code: String,
    host_id: UserId,
    is_active: bool,
    is_lobby_open: bool,
    max_participants: i32,
    draft: Json<StoryDraft>,
    canvas: Json<CanvasLayers>,
    current_page: i32,
    vote: Json<VoteState>,
    autosave_operation_count: i32,
    last_autosave: Option<DateTime<Utc>>,
    connection_count: i32,
    next_sequence: i64,
    host_disconnected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for CollabSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            join_code: row.join_code,
            host_id: row.host_id,
            is_active: row.is_active,
            is_lobby_open: row.is_lobby_open,
            max_participants: u32::try_from(row.max_participants).unwrap_or_default(),
            draft: row.draft.0,
            canvas: row.canvas.0,
            current_page: row.current_page,
            vote: row.vote.0,
            autosave: AutosaveState {
                operation_count: u32::try_from(row.autosave_operation_count).unwrap_or_default(),
                last_autosave: row.last_autosave,
            },
            connection_count: u32::try_from(row.connection_count).unwrap_or_default(),
            next_sequence: row.next_sequence,
            host_disconnected_at: row.host_disconnected_at,
            created_at: row.created_at,
            expires_at: row.expires_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StoryRow {
    id: StoryId,
    session_id: SessionId,
    title: String,
    pages: Json<Vec<StoryPage>>,
    cover_image: Option<Json<serde_json::Value>>,
    author_id: UserId,
    genres: Vec<String>,
    is_published: bool,
    created_at: DateTime<Utc>,
}

fn db_err(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// PostgreSQL backend.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_session(&self, new: NewSession) -> AppResult<CollabSession> {
        let now = Utc::now();
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let session = CollabSession::open(&new, generate_join_code(), now);
            let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

            let inserted = sqlx::query(
                "INSERT INTO collab_sessions \
                 (id, join_code, host_id, is_active, is_lobby_open, max_participants, draft, canvas, \
                  current_page, vote, created_at, expires_at, updated_at) \
                 VALUES ($1, $2, $3, TRUE, TRUE, $4, $5, $6, 0, $7, $8, $9, $8) \
                 ON CONFLICT (join_code) DO NOTHING",
            )
            .bind(session.id)
            .bind(&session.join_code)
            .bind(session.host_id)
            .bind(to_i32(session.max_participants))
            .bind(Json(&session.draft))
            .bind(Json(&session.canvas))
            .bind(Json(&session.vote))
            .bind(now)
            .bind(session.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to create session"))?;

            if inserted.rows_affected() == 0 {
                debug!(join_code = %session.join_code, "Join code collision, retrying");
                continue;
            }

            let mut host = Participant::new(
                session.id,
                new.host_id,
                new.host_username.clone(),
                ParticipantRole::Host,
                pick_cursor_color([]),
                now,
            );
            host.is_active = false;
            upsert_participant(&mut tx, &host).await?;
            tx.commit().await.map_err(db_err("Failed to commit session"))?;
            return Ok(session);
        }
        Err(AppError::internal("Could not allocate a unique join code"))
    }

    pub async fn find_session(&self, id: SessionId) -> AppResult<Option<CollabSession>> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM collab_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(db_err("Failed to find session"))
    }

    pub async fn find_by_join_code(&self, code: &str) -> AppResult<Option<CollabSession>> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM collab_sessions WHERE join_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(db_err("Failed to find session by join code"))
    }

    pub async fn participants(&self, id: SessionId) -> AppResult<Vec<Participant>> {
        sqlx::query_as::<_, Participant>(
            "SELECT * FROM session_participants WHERE session_id = $1 ORDER BY joined_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list participants"))
    }

    pub async fn sessions_for_user(&self, user: UserId) -> AppResult<UserSessions> {
        let hosted = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM collab_sessions WHERE host_id = $1 AND is_active \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user)
        .bind(SESSION_LIST_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list hosted sessions"))?;

        let participated = sqlx::query_as::<_, SessionRow>(
            "SELECT s.* FROM collab_sessions s \
             JOIN session_participants p ON p.session_id = s.id \
             WHERE p.user_id = $1 AND s.host_id <> $1 AND s.is_active \
             ORDER BY s.created_at DESC LIMIT $2",
        )
        .bind(user)
        .bind(SESSION_LIST_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list joined sessions"))?;

        Ok(UserSessions {
            hosted: hosted.into_iter().map(Into::into).collect(),
            participated: participated.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn transact<T, F>(&self, id: SessionId, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut SessionState) -> AppResult<T>,
    {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM collab_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to lock session"))?
        .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;

        let participants = sqlx::query_as::<_, Participant>(
            "SELECT * FROM session_participants WHERE session_id = $1 ORDER BY joined_at",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("Failed to load participants"))?;

        let mut state = SessionState::new(row.into(), participants, Utc::now());
        // Dropping `tx` on error rolls the transaction back.
        let out = f(&mut state)?;

        let (session, participants, operations, story) = state.into_parts();
        write_session(&mut tx, &session).await?;
        for participant in &participants {
            upsert_participant(&mut tx, participant).await?;
        }
        for op in &operations {
            insert_operation(&mut tx, op).await?;
        }
        if let Some(story) = &story {
            insert_story(&mut tx, story).await?;
        }

        tx.commit().await.map_err(db_err("Failed to commit session update"))?;
        Ok(out)
    }

    pub async fn operations(&self, id: SessionId) -> AppResult<Vec<Operation>> {
        sqlx::query_as::<_, Operation>(
            "SELECT * FROM session_operations WHERE session_id = $1 ORDER BY sequence_number",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list operations"))
    }

    pub async fn find_story(&self, id: StoryId) -> AppResult<Option<Story>> {
        let Some(row) = sqlx::query_as::<_, StoryRow>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find story"))?
        else {
            return Ok(None);
        };

        let co_author_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM story_authors WHERE story_id = $1 ORDER BY user_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load story authors"))?
        .into_iter()
        .map(UserId::from_uuid)
        .collect();

        Ok(Some(Story {
            id: row.id,
            session_id: row.session_id,
            title: row.title,
            pages: row.pages.0,
            cover_image: row.cover_image.map(|c| c.0),
            author_id: row.author_id,
            co_author_ids,
            genres: row.genres,
            is_published: row.is_published,
            created_at: row.created_at,
        }))
    }

    pub async fn prune_operations(&self, id: SessionId) -> AppResult<u64> {
        let is_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM collab_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find session"))?
        .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        if is_active {
            return Err(AppError::conflict("Cannot prune an active session"));
        }

        let result = sqlx::query(
            "DELETE FROM session_operations o USING collab_sessions s \
             WHERE o.session_id = s.id AND s.id = $1 AND NOT s.is_active",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to prune operations"))?;
        Ok(result.rows_affected())
    }

    pub async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_err("Health check failed"))
    }
}

async fn write_session(
    tx: &mut Transaction<'static, Postgres>,
    session: &CollabSession,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE collab_sessions SET \
         is_active = $2, is_lobby_open = $3, max_participants = $4, draft = $5, canvas = $6, \
         current_page = $7, vote = $8, autosave_operation_count = $9, last_autosave = $10, \
         connection_count = $11, next_sequence = $12, host_disconnected_at = $13, \
         expires_at = $14, updated_at = $15 \
         WHERE id = $1",
    )
    .bind(session.id)
    .bind(session.is_active)
    .bind(session.is_lobby_open)
    .bind(to_i32(session.max_participants))
    .bind(Json(&session.draft))
    .bind(Json(&session.canvas))
    .bind(session.current_page)
    .bind(Json(&session.vote))
    .bind(to_i32(session.autosave.operation_count))
    .bind(session.autosave.last_autosave)
    .bind(to_i32(session.connection_count))
    .bind(session.next_sequence)
    .bind(session.host_disconnected_at)
    .bind(session.expires_at)
    .bind(session.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err("Failed to update session"))?;
    Ok(())
}

async fn upsert_participant(
    tx: &mut Transaction<'static, Postgres>,
    p: &Participant,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO session_participants \
         (session_id, user_id, username, role, cursor_color, is_active, cursor_position, \
          current_tool, current_page, kicked_at, joined_at, last_seen) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (session_id, user_id) DO UPDATE SET \
         username = EXCLUDED.username, cursor_color = EXCLUDED.cursor_color, \
         is_active = EXCLUDED.is_active, cursor_position = EXCLUDED.cursor_position, \
         current_tool = EXCLUDED.current_tool, current_page = EXCLUDED.current_page, \
         kicked_at = EXCLUDED.kicked_at, last_seen = EXCLUDED.last_seen",
    )
    .bind(p.session_id)
    .bind(p.user_id)
    .bind(&p.username)
    .bind(p.role)
    .bind(&p.cursor_color)
    .bind(p.is_active)
    .bind(&p.cursor_position)
    .bind(&p.current_tool)
    .bind(p.current_page)
    .bind(p.kicked_at)
    .bind(p.joined_at)
    .bind(p.last_seen)
    .execute(&mut **tx)
    .await
    .map_err(db_err("Failed to write participant"))?;
    Ok(())
}

async fn insert_operation(tx: &mut Transaction<'static, Postgres>, op: &Operation) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO session_operations \
         (session_id, user_id, kind, payload, page_number, sequence_number, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(op.session_id)
    .bind(op.user_id)
    .bind(op.kind)
    .bind(&op.payload)
    .bind(op.page_number)
    .bind(op.sequence_number)
    .bind(op.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err("Failed to append operation"))?;
    Ok(())
}

async fn insert_story(tx: &mut Transaction<'static, Postgres>, story: &Story) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO stories \
         (id, session_id, title, pages, cover_image, author_id, genres, is_published, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(story.id)
    .bind(story.session_id)
    .bind(&story.title)
    .bind(Json(&story.pages))
    .bind(story.cover_image.as_ref().map(Json))
    .bind(story.author_id)
    .bind(&story.genres)
    .bind(story.is_published)
    .bind(story.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err("Failed to insert story"))?;

    for co_author in &story.co_author_ids {
        sqlx::query("INSERT INTO story_authors (story_id, user_id) VALUES ($1, $2)")
            .bind(story.id)
            .bind(*co_author)
            .execute(&mut **tx)
            .await
            .map_err(db_err("Failed to attach co-author"))?;
    }
    Ok(())
}
