//! Draft editing: page text, title and page structure.
//!
//! The server-held draft is authoritative. Edits are applied in lock
//! order, so the stored text of a page is always the last committed edit.

use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info};

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_entity::operation::{NewOperation, OperationKind};
use storyhub_entity::session::StoryDraft;

use crate::channel::Audience;
use crate::connection::ConnectionHandle;
use crate::message::MessageLimits;
use crate::message::types::OutboundMessage;
use crate::message::validator::page_in_range;
use crate::presence;
use crate::server::CollabEngine;

use super::require_member;

/// Resolves a page reference to an index.
///
/// String ids are looked up in the draft; numeric ids and explicit
/// indices are taken as positions.
fn resolve_page(
    draft: &StoryDraft,
    page_index: Option<i64>,
    page_id: Option<&Value>,
    limits: &MessageLimits,
) -> AppResult<usize> {
    if let Some(index) = page_index {
        return page_in_range(index, limits);
    }
    match page_id {
        Some(Value::String(id)) => draft
            .index_of(id)
            .ok_or_else(|| AppError::not_found(format!("Unknown page id {id}"))),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| AppError::validation("page_id must be an integer or a string"))
            .and_then(|i| page_in_range(i, limits)),
        _ => Err(AppError::validation("page_index or page_id is required")),
    }
}

impl CollabEngine {
    pub(crate) async fn on_text_edit(
        &self,
        conn: &ConnectionHandle,
        raw: Value,
        page_index: Option<i64>,
        page_id: Option<Value>,
        text: String,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let limits = self.limits;
        let every = self.config.autosave_every_operations;
        let interval = Duration::try_seconds(self.config.autosave_interval_seconds)
            .unwrap_or(Duration::MAX);
        let stored = text.clone();

        let (index, id, sequence, checkpoint) = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let now = state.now();
                let index = resolve_page(&state.session.draft, page_index, page_id.as_ref(), &limits)?;
                state.session.draft.set_page_text(index, stored);
                let id = state.session.draft.pages[index].id.clone();
                let checkpoint = state.session.autosave.record(now, every, interval);
                let page = i32::try_from(index).unwrap_or(i32::MAX);
                let sequence =
                    state.append_operation(NewOperation::new(user, OperationKind::TextEdit, raw, page));
                Ok((index, id, sequence, checkpoint))
            })
            .await?;

        if checkpoint {
            debug!(session_id = %conn.session_id, sequence, "Auto-save checkpoint");
        }

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::Others(conn.id),
            &OutboundMessage::TextEdit {
                user_id: user,
                username: conn.username.clone(),
                page_index: index,
                page_id: id,
                text,
                sequence_number: sequence,
            },
        );
        Ok(())
    }

    pub(crate) async fn on_title_edit(&self, conn: &ConnectionHandle, title: String) -> AppResult<()> {
        let user = conn.user_id;
        let title = title.trim().to_string();
        let stored = title.clone();

        self.store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                state.session.draft.set_title(stored);
                Ok(())
            })
            .await?;

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::Others(conn.id),
            &OutboundMessage::TitleEdit { user_id: user, title },
        );
        Ok(())
    }

    /// Inserts a blank page at the requested index, or appends.
    pub(crate) async fn on_add_page(
        &self,
        conn: &ConnectionHandle,
        raw: Value,
        page_index: Option<i64>,
        page_data: Option<Value>,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let limits = self.limits;
        let requested = page_index.map(|i| page_in_range(i, &limits)).transpose()?;

        let (index, id, page_count, sequence) = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                if state.session.draft.page_count() >= limits.max_pages {
                    return Err(AppError::capacity(format!(
                        "A story holds at most {} pages",
                        limits.max_pages
                    )));
                }
                let before = state.session.draft.page_count();
                let (index, id) = state.session.draft.insert_page(requested);
                if index < before {
                    state.session.canvas.make_room(index);
                }
                let page = i32::try_from(index).unwrap_or(i32::MAX);
                let sequence =
                    state.append_operation(NewOperation::new(user, OperationKind::AddPage, raw, page));
                Ok((index, id, state.session.draft.page_count(), sequence))
            })
            .await?;

        info!(session_id = %conn.session_id, page_index = index, "Page added");
        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::PageAdded {
                user_id: user,
                page_index: index,
                page_id: id,
                page_data,
                page_count,
                sequence_number: sequence,
            },
        );
        Ok(())
    }

    /// Removes a page nobody else is viewing.
    pub(crate) async fn on_delete_page(
        &self,
        conn: &ConnectionHandle,
        raw: Value,
        page_index: Option<i64>,
        page_id: Option<Value>,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let limits = self.limits;

        let (index, id, page_count, sequence) = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let index = resolve_page(&state.session.draft, page_index, page_id.as_ref(), &limits)?;
                if index >= state.session.draft.page_count() {
                    return Err(AppError::not_found(format!("Page {index} does not exist")));
                }

                let viewers = presence::occupants(&state.participants, index, user);
                if !viewers.is_empty() {
                    let names: Vec<&str> = viewers.iter().map(|p| p.username.as_str()).collect();
                    return Err(AppError::validation(format!(
                        "Page {index} is being viewed by {}",
                        names.join(", ")
                    )));
                }

                let removed = state
                    .session
                    .draft
                    .remove_page(index)
                    .ok_or_else(|| AppError::not_found(format!("Page {index} does not exist")))?;
                state.session.canvas.forget_page(index, &removed.id);

                let deleted = i32::try_from(index).unwrap_or(i32::MAX);
                for p in state.participants.iter_mut() {
                    if let Some(page) = p.current_page.filter(|page| *page > deleted) {
                        p.current_page = Some(page - 1);
                    }
                }
                if state.session.current_page > deleted {
                    state.session.current_page -= 1;
                }

                let sequence = state.append_operation(NewOperation::new(
                    user,
                    OperationKind::DeletePage,
                    raw,
                    deleted,
                ));
                Ok((index, removed.id, state.session.draft.page_count(), sequence))
            })
            .await?;

        info!(session_id = %conn.session_id, page_index = index, "Page deleted");
        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::PageDeleted {
                user_id: user,
                page_index: index,
                page_id: id,
                page_count,
                sequence_number: sequence,
            },
        );
        Ok(())
    }
}
