//! Drawing relays: strokes, cursors, clears and object edits.
//!
//! Canvas payloads are opaque here. Logged edits are appended to the
//! operation log and re-broadcast with their sequence number.

use serde_json::Value;
use tracing::debug;

use storyhub_core::result::AppResult;
use storyhub_entity::operation::{NewOperation, OperationKind};
use storyhub_entity::session::CanvasTarget;

use crate::channel::Audience;
use crate::connection::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::server::CollabEngine;

use super::{page_number, page_number_in, require_member};

/// Location fields shared by canvas messages.
#[derive(Debug, Clone, Default)]
pub struct CanvasRef {
    pub page_id: Option<Value>,
    pub page_index: Option<i64>,
    pub is_cover_image: bool,
}

impl CanvasRef {
    pub fn target(&self) -> Option<CanvasTarget> {
        CanvasTarget::resolve(self.is_cover_image, self.page_id.as_ref(), self.page_index)
    }
}

impl CollabEngine {
    /// Appends one operation, optionally storing a fresh snapshot with it.
    pub(crate) async fn log_operation(
        &self,
        conn: &ConnectionHandle,
        kind: OperationKind,
        payload: Value,
        page: i32,
        snapshot: Option<(CanvasTarget, Value)>,
    ) -> AppResult<i64> {
        let user = conn.user_id;
        let sequence = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                if let Some((target, value)) = snapshot {
                    state.session.canvas.write_snapshot(target, value);
                }
                Ok(state.append_operation(NewOperation::new(user, kind, payload, page)))
            })
            .await?;
        debug!(
            session_id = %conn.session_id,
            user_id = %user,
            kind = %kind,
            sequence,
            "Operation logged"
        );
        Ok(sequence)
    }

    pub(crate) async fn on_draw(
        &self,
        conn: &ConnectionHandle,
        mut raw: Value,
        data: Value,
        at: CanvasRef,
        canvas_snapshot: Option<Value>,
    ) -> AppResult<()> {
        if let Some(frame) = raw.as_object_mut() {
            frame.remove("canvas_snapshot");
        }
        let snapshot = canvas_snapshot.and_then(|value| at.target().map(|t| (t, value)));
        let sequence = self
            .log_operation(conn, OperationKind::Draw, raw, page_number(at.page_index), snapshot)
            .await?;

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::Others(conn.id),
            &OutboundMessage::Draw {
                user_id: conn.user_id,
                username: conn.username.clone(),
                data,
                page_id: at.page_id,
                page_index: at.page_index,
                is_cover_image: at.is_cover_image,
                sequence_number: sequence,
            },
        );
        Ok(())
    }

    /// Pointer moves are relayed only, never stored.
    pub(crate) fn on_cursor(&self, conn: &ConnectionHandle, position: Value, at: CanvasRef) {
        self.broadcaster.broadcast(
            conn.session_id,
            Audience::Except(conn.user_id),
            &OutboundMessage::Cursor {
                user_id: conn.user_id,
                username: conn.username.clone(),
                cursor_color: conn.cursor_color.clone(),
                position,
                page_id: at.page_id,
                page_index: at.page_index,
                is_cover_image: at.is_cover_image,
            },
        );
    }

    pub(crate) async fn on_clear(
        &self,
        conn: &ConnectionHandle,
        raw: Value,
        at: CanvasRef,
    ) -> AppResult<()> {
        let sequence = self
            .log_operation(conn, OperationKind::Clear, raw, page_number(at.page_index), None)
            .await?;

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::Clear {
                user_id: conn.user_id,
                page_id: at.page_id,
                page_index: at.page_index,
                is_cover_image: at.is_cover_image,
                sequence_number: sequence,
            },
        );
        Ok(())
    }

    /// Object-level canvas edits, logged and relayed to everybody else.
    pub(crate) async fn on_object_edit(
        &self,
        conn: &ConnectionHandle,
        kind: OperationKind,
        raw: Value,
        data: Value,
        operation: Option<Value>,
    ) -> AppResult<()> {
        let sequence = self
            .log_operation(conn, kind, raw, page_number_in(&data), None)
            .await?;

        let user_id = conn.user_id;
        let sequence_number = sequence;
        let msg = match kind {
            OperationKind::Transform => OutboundMessage::Transform {
                user_id,
                data,
                sequence_number,
            },
            OperationKind::Delete => OutboundMessage::Delete {
                user_id,
                data,
                sequence_number,
            },
            OperationKind::TextEditAdvanced => OutboundMessage::TextEditAdvanced {
                user_id,
                data,
                sequence_number,
            },
            OperationKind::LayerOperation => OutboundMessage::LayerOperation {
                user_id,
                operation: operation.unwrap_or(Value::Null),
                data,
                sequence_number,
            },
            OperationKind::TransformOperation => OutboundMessage::TransformOperation {
                user_id,
                data,
                sequence_number,
            },
            OperationKind::DeleteItem => OutboundMessage::DeleteItem {
                user_id,
                data,
                sequence_number,
            },
            other => {
                debug!(kind = %other, "Not an object edit, nothing to relay");
                return Ok(());
            }
        };
        self.broadcaster
            .broadcast(conn.session_id, Audience::Others(conn.id), &msg);
        Ok(())
    }
}
