//! Routes parsed inbound frames to their handlers.

use tracing::{debug, warn};

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::ConnectionId;
use storyhub_entity::operation::OperationKind;

use crate::connection::ConnectionHandle;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{validate_inbound, validate_message};
use crate::metrics::messages;
use crate::server::CollabEngine;

use super::drawing::CanvasRef;

impl CollabEngine {
    /// Handles one text frame from `conn_id`.
    ///
    /// Failures are answered with a private `error` frame; they never
    /// mutate state and never reach other participants.
    pub async fn handle_inbound(&self, conn_id: ConnectionId, text: &str) {
        let Some(conn) = self.pool.get(&conn_id) else {
            return;
        };
        messages::record_received(&self.metrics);

        if let Err(e) = self.dispatch(&conn, text).await {
            messages::record_rejected(&self.metrics);
            warn!(
                conn_id = %conn_id,
                session_id = %conn.session_id,
                user_id = %conn.user_id,
                code = %e.kind,
                error = %e.message,
                "Inbound message rejected"
            );
            self.broadcaster.send_to(
                &conn,
                &OutboundMessage::Error {
                    code: e.kind.to_string(),
                    message: e.message,
                },
            );
        }
    }

    async fn dispatch(&self, conn: &ConnectionHandle, text: &str) -> AppResult<()> {
        validate_inbound(text, &self.limits)?;
        let (msg, raw) = deserialize_inbound(text)
            .map_err(|e| AppError::validation(format!("Malformed message: {e}")))?;
        validate_message(&msg, &self.limits)?;

        debug!(
            conn_id = %conn.id,
            session_id = %conn.session_id,
            kind = msg.type_name(),
            "Dispatching"
        );

        match msg {
            InboundMessage::Draw {
                data,
                page_id,
                page_index,
                is_cover_image,
                canvas_snapshot,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_draw(conn, raw, data, at, canvas_snapshot).await
            }
            InboundMessage::Cursor {
                position,
                page_id,
                page_index,
                is_cover_image,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_cursor(conn, position, at);
                Ok(())
            }
            InboundMessage::Clear {
                page_id,
                page_index,
                is_cover_image,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_clear(conn, raw, at).await
            }
            InboundMessage::Transform { data } => {
                self.on_object_edit(conn, OperationKind::Transform, raw, data, None)
                    .await
            }
            InboundMessage::Delete { data } => {
                self.on_object_edit(conn, OperationKind::Delete, raw, data, None)
                    .await
            }
            InboundMessage::TextEditAdvanced { data } => {
                self.on_object_edit(conn, OperationKind::TextEditAdvanced, raw, data, None)
                    .await
            }
            InboundMessage::LayerOperation { operation, data } => {
                self.on_object_edit(conn, OperationKind::LayerOperation, raw, data, Some(operation))
                    .await
            }
            InboundMessage::TransformOperation { data } => {
                self.on_object_edit(conn, OperationKind::TransformOperation, raw, data, None)
                    .await
            }
            InboundMessage::DeleteItem { data } => {
                self.on_object_edit(conn, OperationKind::DeleteItem, raw, data, None)
                    .await
            }
            InboundMessage::TextEdit {
                page_index,
                page_id,
                text,
            } => self.on_text_edit(conn, raw, page_index, page_id, text).await,
            InboundMessage::TitleEdit { title } => self.on_title_edit(conn, title).await,
            InboundMessage::AddPage {
                page_index,
                page_data,
            } => self.on_add_page(conn, raw, page_index, page_data).await,
            InboundMessage::DeletePage {
                page_index,
                page_id,
            } => self.on_delete_page(conn, raw, page_index, page_id).await,
            InboundMessage::PageChange { page_number } => {
                self.on_page_change(conn, raw, page_number).await
            }
            InboundMessage::PresenceUpdate {
                cursor_position,
                current_tool,
                activity,
            } => {
                self.on_presence_update(conn, cursor_position, current_tool, activity)
                    .await
            }
            InboundMessage::GetPageViewers {} => self.on_get_page_viewers(conn).await,
            InboundMessage::KickUser { user_id } => self.on_kick_user(conn, user_id).await,
            InboundMessage::InitiateVote {} => self.on_initiate_vote(conn).await,
            InboundMessage::VoteSave { vote } => self.on_vote_save(conn, vote).await,
            InboundMessage::FinalizeCollaborativeStory { genres, title } => {
                self.on_finalize(conn, title, genres).await
            }
            InboundMessage::CanvasSnapshot {
                page_id,
                page_index,
                is_cover_image,
                canvas_data_url,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_canvas_snapshot(conn, at, canvas_data_url).await
            }
            InboundMessage::RequestSync {
                page_id,
                page_index,
                is_cover_image,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_request_sync(conn, at).await
            }
            InboundMessage::CanvasState {
                target_user_id,
                canvas_data,
                page_id,
                page_index,
                is_cover_image,
            } => {
                let at = CanvasRef {
                    page_id,
                    page_index,
                    is_cover_image,
                };
                self.on_canvas_state(conn, target_user_id, canvas_data, at)
                    .await
            }
        }
    }
}
