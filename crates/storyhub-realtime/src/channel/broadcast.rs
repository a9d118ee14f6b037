//! Fire-and-forget fan-out of outbound messages to a session group.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use storyhub_core::types::id::{ConnectionId, SessionId, UserId};

use crate::bridge::RedisPubSubBridge;
use crate::connection::{CloseReason, ConnectionHandle, ConnectionPool, Frame};
use crate::message::serializer::serialize_outbound;
use crate::message::types::OutboundMessage;
use crate::metrics::{EngineMetrics, messages};

use super::registry::ChannelRegistry;

/// Which members of a group receive a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Audience {
    /// Everybody, the sender included.
    All,
    /// Everybody except every connection of this user.
    Except(UserId),
    /// Every connection but the sending one, so other tabs of the sender
    /// still receive the frame.
    Others(ConnectionId),
    /// Only the connections of this user.
    Only(UserId),
}

impl Audience {
    pub fn includes(&self, handle: &ConnectionHandle) -> bool {
        match self {
            Self::All => true,
            Self::Except(excluded) => *excluded != handle.user_id,
            Self::Others(sender) => *sender != handle.id,
            Self::Only(target) => *target == handle.user_id,
        }
    }
}

/// Delivers frames to group members without ever waiting on a peer.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    pool: Arc<ConnectionPool>,
    channels: Arc<ChannelRegistry>,
    metrics: Arc<EngineMetrics>,
    relay: Arc<OnceLock<Arc<RedisPubSubBridge>>>,
}

impl Broadcaster {
    pub fn new(
        pool: Arc<ConnectionPool>,
        channels: Arc<ChannelRegistry>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool,
            channels,
            metrics,
            relay: Arc::new(OnceLock::new()),
        }
    }

    /// Forwards every broadcast to other processes through `bridge`.
    pub fn attach_relay(&self, bridge: Arc<RedisPubSubBridge>) {
        let _ = self.relay.set(bridge);
    }

    /// Sends a private message to one connection.
    pub fn send_to(&self, handle: &ConnectionHandle, msg: &OutboundMessage) -> bool {
        match encode(msg) {
            Some(frame) => self.deliver(handle, frame),
            None => false,
        }
    }

    /// Serializes once and fans the frame out to the local group and any relay.
    pub fn broadcast(&self, session_id: SessionId, audience: Audience, msg: &OutboundMessage) {
        let Some(frame) = encode(msg) else {
            return;
        };
        let delivered = self.deliver_local(session_id, audience, Arc::clone(&frame));
        debug!(
            session_id = %session_id,
            audience = ?audience,
            delivered,
            "Broadcast"
        );
        if let Some(relay) = self.relay.get() {
            relay.publish(session_id, audience, frame);
        }
    }

    /// Delivers an already serialized frame to this process's members only.
    pub fn deliver_local(&self, session_id: SessionId, audience: Audience, frame: Frame) -> usize {
        self.channels
            .members(session_id)
            .into_iter()
            .filter_map(|conn_id| self.pool.get(&conn_id))
            .filter(|handle| audience.includes(handle))
            .filter(|handle| self.deliver(handle, Arc::clone(&frame)))
            .count()
    }

    /// Closes every local connection of a session and dissolves its group.
    pub fn close_group(&self, session_id: SessionId, reason: CloseReason) -> Vec<ConnectionId> {
        let members = self.channels.dissolve(session_id);
        for conn_id in &members {
            if let Some(handle) = self.pool.get(conn_id) {
                handle.close(reason);
            }
        }
        members
    }

    /// Closes the local connections of one user in a session.
    pub fn close_user(&self, session_id: SessionId, user_id: UserId, reason: CloseReason) -> usize {
        let handles = self.pool.user_connections_in_session(session_id, user_id);
        for handle in &handles {
            handle.close(reason);
        }
        handles.len()
    }

    fn deliver(&self, handle: &ConnectionHandle, frame: Frame) -> bool {
        let was_alive = handle.is_alive();
        let sent = handle.send(frame);
        if sent {
            messages::record_sent(&self.metrics);
        } else if was_alive && handle.close_reason() == Some(CloseReason::SlowConsumer) {
            messages::record_dropped_peer(&self.metrics);
        }
        sent
    }
}

fn encode(msg: &OutboundMessage) -> Option<Frame> {
    match serialize_outbound(msg) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::connection::ConnectionIdentity;

    fn handle(user_id: UserId) -> Arc<ConnectionHandle> {
        let (handle, _rx) = ConnectionHandle::new(
            ConnectionIdentity {
                id: ConnectionId::new(),
                user_id,
                session_id: SessionId::new(),
                username: "u".into(),
                cursor_color: "#000000".into(),
                is_host: false,
            },
            4,
        );
        handle
    }

    #[test]
    fn test_audience_membership() {
        let (a, b) = (UserId::new(), UserId::new());
        let (ha, hb) = (handle(a), handle(b));
        assert!(Audience::All.includes(&ha));
        assert!(!Audience::Except(a).includes(&ha));
        assert!(Audience::Except(a).includes(&hb));
        assert!(Audience::Only(b).includes(&hb));
        assert!(!Audience::Only(b).includes(&ha));
    }

    #[test]
    fn test_others_keeps_sibling_tabs() {
        let a = UserId::new();
        let (tab1, tab2) = (handle(a), handle(a));
        assert!(!Audience::Others(tab1.id).includes(&tab1));
        assert!(Audience::Others(tab1.id).includes(&tab2));
        assert!(!Audience::Except(a).includes(&tab2));
    }
}
