//! Top-level collaboration engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use storyhub_core::config::CollabConfig;
use storyhub_core::error::{AppError, ErrorKind};
use storyhub_core::types::id::{ConnectionId, SessionId};
use storyhub_database::SessionStore;
use storyhub_entity::participant::{Participant, ParticipantRole, pick_cursor_color};

use crate::bridge::RedisPubSubBridge;
use crate::channel::{Audience, Broadcaster, ChannelRegistry};
use crate::connection::{
    AuthenticatedUser, CloseReason, ConnectionHandle, ConnectionIdentity, ConnectionPool, Frame,
};
use crate::message::types::{OutboundMessage, VoteSummary};
use crate::message::MessageLimits;
use crate::metrics::{EngineMetrics, MetricsSnapshot, connections};
use crate::presence;
use crate::session_control::guard::{self, GuardPolicy, Verdict};
use crate::session_control::terminator;

/// A socket admitted into a session: its handle and the queue its writer drains.
pub type Admitted = (Arc<ConnectionHandle>, mpsc::Receiver<Frame>);

/// How an admission attempt ended inside the unit of work.
enum Admission {
    Accepted {
        handle: Arc<ConnectionHandle>,
        rx: mpsc::Receiver<Frame>,
        announce: bool,
    },
    Refused(CloseReason),
    HostGone {
        username: String,
    },
    Expired {
        story_title: String,
    },
}

/// Central collaboration engine shared by every connection of this process.
pub struct CollabEngine {
    pub(crate) store: SessionStore,
    pub(crate) pool: Arc<ConnectionPool>,
    pub(crate) channels: Arc<ChannelRegistry>,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) metrics: Arc<EngineMetrics>,
    pub(crate) config: CollabConfig,
    pub(crate) limits: MessageLimits,
}

impl std::fmt::Debug for CollabEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabEngine")
            .field("backend", &self.store.backend_name())
            .field("connections", &self.pool.connection_count())
            .finish()
    }
}

impl CollabEngine {
    /// Creates a new engine over `store`.
    pub fn new(store: SessionStore, config: CollabConfig) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let channels = Arc::new(ChannelRegistry::new());
        let broadcaster = Broadcaster::new(pool.clone(), channels.clone(), metrics.clone());
        let limits = MessageLimits::from(&config);

        info!(
            backend = store.backend_name(),
            max_connections = config.max_connections_per_session,
            host_grace_seconds = config.host_grace_seconds,
            "Collaboration engine initialized"
        );

        Self {
            store,
            pool,
            channels,
            broadcaster,
            metrics,
            config,
            limits,
        }
    }

    /// Relays every broadcast through `bridge` as well.
    pub fn attach_relay(&self, bridge: Arc<RedisPubSubBridge>) {
        self.broadcaster.attach_relay(bridge);
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn config(&self) -> &CollabConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of sockets held by this process.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Admits an authenticated socket into a session.
    ///
    /// On success the connection is registered with the session's group and
    /// its queue already holds the `init` snapshot.
    pub async fn connect(
        &self,
        session_id: SessionId,
        user: &AuthenticatedUser,
    ) -> Result<Admitted, CloseReason> {
        let conn_id = ConnectionId::new();
        let policy = GuardPolicy {
            host_grace: self.config.host_grace(),
            max_connections: self.config.max_connections_per_session,
        };
        let user_id = user.user_id;
        let username = user.username.clone();

        let result = self
            .store
            .transact(session_id, |state| {
                let now = state.now();
                let verdict = guard::check(&state.session, &state.participants, user_id, now, &policy);
                let reconnecting = match verdict {
                    Verdict::Admit { reconnecting } => reconnecting,
                    Verdict::Refuse(reason) => return Ok(Admission::Refused(reason)),
                    Verdict::TearDown => {
                        let host_id = state.session.host_id;
                        let username = state
                            .participant(host_id)
                            .map(|p| p.username.clone())
                            .unwrap_or_default();
                        state.session.deactivate();
                        return Ok(Admission::HostGone { username });
                    }
                    Verdict::Expired => {
                        state.session.deactivate();
                        return Ok(Admission::Expired {
                            story_title: state.session.draft.title.clone(),
                        });
                    }
                };

                let is_host = state.session.is_host(user_id);
                let (participant, announce) = match state.participant(user_id) {
                    Some(existing) => {
                        let mut row = existing.clone();
                        let announce = !row.is_active;
                        row.is_active = true;
                        row.username = username.clone();
                        row.last_seen = now;
                        (row, announce)
                    }
                    None => {
                        let color = pick_cursor_color(
                            state.participants.iter().map(|p| p.cursor_color.as_str()),
                        );
                        let role = if is_host {
                            ParticipantRole::Host
                        } else {
                            ParticipantRole::Participant
                        };
                        let row = Participant::new(session_id, user_id, &username, role, color, now);
                        (row, true)
                    }
                };
                let cursor_color = participant.cursor_color.clone();
                state.upsert_participant(participant);

                if is_host {
                    state.session.host_disconnected_at = None;
                    state.session.is_active = true;
                }
                state.session.connection_count += 1;

                let (handle, rx) = ConnectionHandle::new(
                    ConnectionIdentity {
                        id: conn_id,
                        user_id,
                        session_id,
                        username: username.clone(),
                        cursor_color: cursor_color.clone(),
                        is_host,
                    },
                    self.config.outbound_buffer,
                );

                let init = OutboundMessage::Init {
                    session_id,
                    canvas_data: state.session.canvas.merged(),
                    story_draft: state.session.draft.clone(),
                    participants: presence::roster(&state.participants),
                    your_color: cursor_color,
                    current_user_id: user_id,
                    current_username: username.clone(),
                    is_host,
                    is_lobby_open: state.session.is_lobby_open,
                    current_page: state.session.current_page,
                    vote: VoteSummary::from(&state.session.vote),
                };
                self.broadcaster.send_to(&handle, &init);
                self.pool.add(handle.clone());
                self.channels.join(session_id, conn_id);

                debug!(
                    session_id = %session_id,
                    user_id = %user_id,
                    reconnecting,
                    "Admission granted"
                );
                Ok(Admission::Accepted {
                    handle,
                    rx,
                    announce,
                })
            })
            .await;

        let admission = match result {
            Ok(admission) => admission,
            Err(e) => {
                self.unregister(session_id, conn_id);
                let reason = if e.kind == ErrorKind::NotFound {
                    CloseReason::SessionNotFound
                } else {
                    warn!(session_id = %session_id, error = %e, "Admission failed");
                    CloseReason::InternalError
                };
                connections::record_refused(&self.metrics);
                return Err(reason);
            }
        };

        match admission {
            Admission::Accepted {
                handle,
                rx,
                announce,
            } => {
                connections::record_connect(&self.metrics);
                info!(
                    conn_id = %handle.id,
                    session_id = %session_id,
                    user_id = %user_id,
                    is_host = handle.is_host,
                    "Connection admitted"
                );
                if announce {
                    self.broadcaster.broadcast(
                        session_id,
                        Audience::Except(user_id),
                        &OutboundMessage::UserJoined {
                            user_id,
                            username: handle.username.clone(),
                            cursor_color: handle.cursor_color.clone(),
                        },
                    );
                }
                Ok((handle, rx))
            }
            Admission::Refused(reason) => {
                connections::record_refused(&self.metrics);
                warn!(
                    session_id = %session_id,
                    user_id = %user_id,
                    reason = %reason,
                    "Connection refused"
                );
                Err(reason)
            }
            Admission::HostGone { username } => {
                connections::record_refused(&self.metrics);
                info!(session_id = %session_id, "Host grace elapsed, tearing session down");
                terminator::host_left(&self.broadcaster, session_id, username);
                Err(CloseReason::NotEligible)
            }
            Admission::Expired { story_title } => {
                connections::record_refused(&self.metrics);
                info!(session_id = %session_id, "Session expired");
                terminator::end_session(&self.broadcaster, session_id, story_title, "expired");
                Err(CloseReason::NotEligible)
            }
        }
    }

    /// Releases a connection's slot and updates presence.
    ///
    /// The participant goes inactive only when this was their last live
    /// connection in the session. A departing host leaves a timestamp
    /// behind instead of ending the session.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let Some(handle) = self.pool.remove(&conn_id) else {
            return;
        };
        handle.mark_dead();
        self.channels.leave(handle.session_id, conn_id);
        connections::record_disconnect(&self.metrics);

        let session_id = handle.session_id;
        let user_id = handle.user_id;
        let last_connection = self
            .pool
            .user_connections_in_session(session_id, user_id)
            .is_empty();

        let result = self
            .store
            .transact(session_id, move |state| {
                let now = state.now();
                state.session.connection_count = state.session.connection_count.saturating_sub(1);
                if !last_connection {
                    return Ok((None, None));
                }
                let was_active = match state.participant_mut(user_id) {
                    Some(p) => {
                        let was_active = p.is_active;
                        p.is_active = false;
                        p.last_seen = now;
                        was_active
                    }
                    None => false,
                };
                let is_host = state.session.is_host(user_id);
                if is_host && state.session.is_active {
                    state.session.host_disconnected_at = Some(now);
                }
                let departed = was_active && state.session.is_active;
                let abandoned = departed
                    .then(|| state.session.vote.abandon(user_id))
                    .flatten();
                Ok((departed.then_some(is_host), abandoned))
            })
            .await;

        let abandoned = match result {
            Ok((Some(is_host), abandoned)) => {
                info!(
                    conn_id = %conn_id,
                    session_id = %session_id,
                    user_id = %user_id,
                    is_host,
                    "Participant left"
                );
                self.broadcaster.broadcast(
                    session_id,
                    Audience::Except(user_id),
                    &OutboundMessage::UserLeft {
                        user_id,
                        username: handle.username.clone(),
                        is_host,
                        temporary: is_host,
                    },
                );
                abandoned
            }
            Ok((None, abandoned)) => {
                debug!(conn_id = %conn_id, session_id = %session_id, "Connection closed");
                abandoned
            }
            Err(e) => {
                warn!(
                    conn_id = %conn_id,
                    session_id = %session_id,
                    error = %e,
                    "Failed to record disconnect"
                );
                None
            }
        };
        if let Some(tally) = abandoned {
            self.announce_abandoned_vote(session_id, &tally);
        }
    }

    /// Sends a private error frame to one connection.
    pub fn reply_error(&self, conn_id: ConnectionId, error: &AppError) {
        if let Some(handle) = self.pool.get(&conn_id) {
            self.broadcaster.send_to(
                &handle,
                &OutboundMessage::Error {
                    code: error.kind.to_string(),
                    message: error.message.clone(),
                },
            );
        }
    }

    /// Closes every connection of this process.
    pub fn shutdown(&self) {
        let handles = self.pool.all();
        info!(connections = handles.len(), "Shutting down collaboration engine");
        for handle in handles {
            handle.close(CloseReason::ServerShutdown);
        }
    }

    fn unregister(&self, session_id: SessionId, conn_id: ConnectionId) {
        self.channels.leave(session_id, conn_id);
        if let Some(handle) = self.pool.remove(&conn_id) {
            handle.close(CloseReason::InternalError);
        }
    }
}
