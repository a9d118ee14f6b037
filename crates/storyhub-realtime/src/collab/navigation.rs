//! Page navigation and live presence.

use serde_json::Value;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_entity::operation::{NewOperation, OperationKind};

use crate::channel::Audience;
use crate::connection::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::presence;
use crate::server::CollabEngine;

use super::require_member;

impl CollabEngine {
    /// Moves the caller to `page_number`.
    ///
    /// The participant's `current_page` is written in the same unit of work
    /// as the logged navigation, so the latest navigation always wins.
    pub(crate) async fn on_page_change(
        &self,
        conn: &ConnectionHandle,
        raw: Value,
        page_number: i64,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let page = i32::try_from(page_number)
            .map_err(|_| AppError::validation("page_number out of range"))?;

        let sequence = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let now = state.now();
                if let Some(p) = state.participant_mut(user) {
                    p.current_page = Some(page);
                    p.last_seen = now;
                }
                state.session.current_page = page;
                Ok(state.append_operation(NewOperation::new(
                    user,
                    OperationKind::PageChange,
                    raw,
                    page,
                )))
            })
            .await?;

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::PageChange {
                user_id: user,
                username: conn.username.clone(),
                page_number: page,
                sequence_number: sequence,
            },
        );
        Ok(())
    }

    /// Stores the caller's cursor and tool, then relays them. Never logged.
    pub(crate) async fn on_presence_update(
        &self,
        conn: &ConnectionHandle,
        cursor_position: Option<Value>,
        current_tool: Option<String>,
        activity: Option<Value>,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let position = cursor_position.clone();
        let tool = current_tool.clone();

        self.store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let now = state.now();
                if let Some(p) = state.participant_mut(user) {
                    if position.is_some() {
                        p.cursor_position = position;
                    }
                    if tool.is_some() {
                        p.current_tool = tool;
                    }
                    p.last_seen = now;
                }
                Ok(())
            })
            .await?;

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::Except(user),
            &OutboundMessage::PresenceUpdate {
                user_id: user,
                username: conn.username.clone(),
                cursor_position,
                current_tool,
                activity,
            },
        );
        Ok(())
    }

    /// Replies privately with the active participants grouped by page.
    pub(crate) async fn on_get_page_viewers(&self, conn: &ConnectionHandle) -> AppResult<()> {
        let participants = self.store.participants(conn.session_id).await?;
        self.broadcaster.send_to(
            conn,
            &OutboundMessage::PageViewersResponse {
                page_viewers: presence::page_viewers(&participants),
            },
        );
        Ok(())
    }
}
