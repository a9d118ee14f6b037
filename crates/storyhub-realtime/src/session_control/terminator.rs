//! WebSocket-level session termination.

use tracing::info;

use storyhub_core::types::id::SessionId;

use crate::channel::{Audience, Broadcaster};
use crate::connection::CloseReason;
use crate::message::types::OutboundMessage;

/// Announces that the host is gone for good and disconnects everybody.
pub fn host_left(broadcaster: &Broadcaster, session_id: SessionId, username: String) {
    broadcaster.broadcast(
        session_id,
        Audience::All,
        &OutboundMessage::HostLeft {
            session_id,
            username,
        },
    );
    let closed = broadcaster.close_group(session_id, CloseReason::HostLeft);
    info!(session_id = %session_id, closed = closed.len(), "Session torn down after host left");
}

/// Announces the end of a session and disconnects everybody.
///
/// `ended_by` is `"host"`, `"vote"` or `"expired"`.
pub fn end_session(
    broadcaster: &Broadcaster,
    session_id: SessionId,
    story_title: String,
    ended_by: &str,
) {
    broadcaster.broadcast(
        session_id,
        Audience::All,
        &OutboundMessage::SessionEnded {
            session_id,
            story_title,
            ended_by: ended_by.to_string(),
        },
    );
    let closed = broadcaster.close_group(session_id, CloseReason::SessionEnded);
    info!(
        session_id = %session_id,
        ended_by,
        closed = closed.len(),
        "Session ended"
    );
}
