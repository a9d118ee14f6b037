//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use storyhub_core::types::id::{ConnectionId, SessionId, UserId};

use super::close::CloseReason;

/// Serialized frame queued for one client.
pub type Frame = Arc<str>;

/// A handle to a single WebSocket connection.
///
/// Holds the bounded sender feeding the socket writer task plus the
/// identity the connection was admitted with. Sending never blocks: a full
/// queue disconnects the peer instead of stalling the broadcaster.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Session this connection belongs to
    pub session_id: SessionId,
    /// Username (cached for display)
    pub username: String,
    /// Cursor colour assigned at admission
    pub cursor_color: String,
    /// Whether the user hosts the session
    pub is_host: bool,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Frame>,
    alive: AtomicBool,
    shutdown: CancellationToken,
    close_reason: OnceLock<CloseReason>,
}

/// Identity a connection is admitted with.
#[derive(Debug, Clone)]
pub struct ConnectionIdentity {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub username: String,
    pub cursor_color: String,
    pub is_host: bool,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer task drains.
    pub fn new(identity: ConnectionIdentity, buffer: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Arc::new(Self {
            id: identity.id,
            user_id: identity.user_id,
            session_id: identity.session_id,
            username: identity.username,
            cursor_color: identity.cursor_color,
            is_host: identity.is_host,
            connected_at: Utc::now(),
            sender,
            alive: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            close_reason: OnceLock::new(),
        });
        (handle, receiver)
    }

    /// Queue a frame. Returns `false` when the frame was not delivered.
    pub fn send(&self, frame: Frame) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    conn_id = %self.id,
                    user_id = %self.user_id,
                    "Outbound queue full, disconnecting slow consumer"
                );
                self.close(CloseReason::SlowConsumer);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Ask the writer task to close the socket. The first reason wins.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.close_reason.set(reason);
        self.mark_dead();
        self.shutdown.cancel();
    }

    /// Reason recorded by [`ConnectionHandle::close`], if any.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// Token cancelled once the connection must shut down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
