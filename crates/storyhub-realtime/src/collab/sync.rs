//! Canvas persistence and reconnect recovery.
//!
//! Stored canvas state supersedes stored snapshots. A rejoining client is
//! answered from storage first; peers are asked to replay only when
//! nothing is stored for the target yet.

use serde_json::Value;
use tracing::debug;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::UserId;
use storyhub_entity::session::CanvasTarget;

use crate::channel::Audience;
use crate::connection::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::server::CollabEngine;

use super::drawing::CanvasRef;
use super::require_member;

fn require_target(at: &CanvasRef) -> AppResult<CanvasTarget> {
    at.target().ok_or_else(|| {
        AppError::validation("page_id, page_index or is_cover_image is required")
    })
}

impl CollabEngine {
    /// Stores a rendered snapshot. Nothing is broadcast.
    pub(crate) async fn on_canvas_snapshot(
        &self,
        conn: &ConnectionHandle,
        at: CanvasRef,
        canvas_data_url: Value,
    ) -> AppResult<()> {
        let target = require_target(&at)?;
        let user = conn.user_id;
        self.store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                state.session.canvas.write_snapshot(target, canvas_data_url);
                Ok(())
            })
            .await
    }

    /// Answers a rejoining client from storage, or asks peers to replay.
    pub(crate) async fn on_request_sync(&self, conn: &ConnectionHandle, at: CanvasRef) -> AppResult<()> {
        let target = require_target(&at)?;
        let session = self
            .store
            .find_session(conn.session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        session.ensure_active()?;

        let by_index = at
            .page_index
            .filter(|_| !at.is_cover_image)
            .map(|i| CanvasTarget::Page(i.to_string()));
        let stored = session
            .canvas
            .authoritative(&target)
            .or_else(|| by_index.as_ref().and_then(|t| session.canvas.authoritative(t)))
            .cloned();

        match stored {
            Some(canvas_data) => {
                debug!(session_id = %conn.session_id, user_id = %conn.user_id, "Sync served from storage");
                self.broadcaster.send_to(
                    conn,
                    &OutboundMessage::CanvasState {
                        sender_user_id: "server".to_string(),
                        canvas_data,
                        page_id: at.page_id,
                        page_index: at.page_index,
                        is_cover_image: at.is_cover_image,
                    },
                );
            }
            None => {
                debug!(session_id = %conn.session_id, user_id = %conn.user_id, "Sync requested from peers");
                self.broadcaster.broadcast(
                    conn.session_id,
                    Audience::Except(conn.user_id),
                    &OutboundMessage::RequestCanvasState {
                        requester_id: conn.user_id,
                        page_id: at.page_id,
                        page_index: at.page_index,
                        is_cover_image: at.is_cover_image,
                    },
                );
            }
        }
        Ok(())
    }

    /// Stores a full canvas state and forwards it to `target_user` if given.
    ///
    /// Without a target this is a plain auto-save.
    pub(crate) async fn on_canvas_state(
        &self,
        conn: &ConnectionHandle,
        target_user: Option<UserId>,
        canvas_data: Value,
        at: CanvasRef,
    ) -> AppResult<()> {
        let target = at.target();
        if target.is_none() && target_user.is_none() {
            return Err(AppError::validation(
                "page_id, page_index or is_cover_image is required",
            ));
        }

        let user = conn.user_id;
        let stored = canvas_data.clone();
        self.store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                if let Some(target) = target {
                    state.session.canvas.write_state(target, stored);
                }
                Ok(())
            })
            .await?;

        if let Some(recipient) = target_user {
            self.broadcaster.broadcast(
                conn.session_id,
                Audience::Only(recipient),
                &OutboundMessage::CanvasState {
                    sender_user_id: user.to_string(),
                    canvas_data,
                    page_id: at.page_id,
                    page_index: at.page_index,
                    is_cover_image: at.is_cover_image,
                },
            );
        }
        Ok(())
    }
}
