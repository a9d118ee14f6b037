//! Host-only moderation.

use tracing::info;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::UserId;

use crate::channel::Audience;
use crate::connection::{CloseReason, ConnectionHandle};
use crate::message::types::OutboundMessage;
use crate::server::CollabEngine;

impl CollabEngine {
    /// Removes `target` from the session and closes their sockets.
    ///
    /// The membership row is kept and flagged, so the user cannot come
    /// back through the lobby or a reconnect.
    pub(crate) async fn on_kick_user(&self, conn: &ConnectionHandle, target: UserId) -> AppResult<()> {
        let host = conn.user_id;

        let abandoned = self
            .store
            .transact(conn.session_id, move |state| {
                state.session.ensure_active()?;
                if !state.session.is_host(host) {
                    return Err(AppError::authorization("Only the host can remove participants"));
                }
                if target == host {
                    return Err(AppError::validation("The host cannot remove themselves"));
                }
                let now = state.now();
                let member = state
                    .participant_mut(target)
                    .ok_or_else(|| AppError::not_found("User is not a participant"))?;
                member.is_active = false;
                member.kicked_at = Some(now);
                member.last_seen = now;
                Ok(state.session.vote.abandon(target))
            })
            .await?;

        info!(session_id = %conn.session_id, kicked_user_id = %target, "Participant removed");
        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::UserKicked {
                kicked_user_id: target,
                by_user: host,
            },
        );
        self.broadcaster
            .close_user(conn.session_id, target, CloseReason::Kicked);
        if let Some(tally) = abandoned {
            self.announce_abandoned_vote(conn.session_id, &tally);
        }
        Ok(())
    }
}
