//! Redis pub/sub bridge for multi-process deployments.
//!
//! Every broadcast is published once on a shared channel; each process
//! delivers frames that originated elsewhere to its own local members.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storyhub_core::types::id::SessionId;

use crate::channel::broadcast::Audience;

/// Redis channel carrying relayed frames.
pub const RELAY_CHANNEL: &str = "storyhub:collab";

/// One relayed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope {
    /// Process that published the frame.
    pub origin: Uuid,
    pub session_id: SessionId,
    pub audience: Audience,
    /// Serialized outbound message.
    pub payload: String,
}

#[cfg(feature = "redis-pubsub")]
pub mod implementation {
    use std::sync::Arc;

    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, error, info, warn};
    use uuid::Uuid;

    use storyhub_core::error::AppError;
    use storyhub_core::result::AppResult;
    use storyhub_core::types::id::SessionId;

    use super::{RELAY_CHANNEL, RelayEnvelope};
    use crate::channel::broadcast::{Audience, Broadcaster};
    use crate::connection::Frame;

    /// Redis pub/sub bridge for cross-process message relay.
    pub struct RedisPubSubBridge {
        node_id: Uuid,
        client: redis::Client,
        publisher: redis::aio::MultiplexedConnection,
    }

    impl std::fmt::Debug for RedisPubSubBridge {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisPubSubBridge")
                .field("node_id", &self.node_id)
                .finish()
        }
    }

    impl RedisPubSubBridge {
        /// Opens the publishing connection.
        pub async fn connect(url: &str) -> AppResult<Self> {
            let client = redis::Client::open(url)
                .map_err(|e| AppError::configuration(format!("Invalid Redis URL: {e}")))?;
            let publisher = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| {
                    AppError::service_unavailable(format!("Redis connection failed: {e}"))
                })?;
            let node_id = Uuid::new_v4();
            info!(node_id = %node_id, "Redis relay connected");
            Ok(Self {
                node_id,
                client,
                publisher,
            })
        }

        /// Publishes a frame without waiting for Redis.
        pub fn publish(&self, session_id: SessionId, audience: Audience, frame: Frame) {
            let envelope = RelayEnvelope {
                origin: self.node_id,
                session_id,
                audience,
                payload: frame.to_string(),
            };
            let message = match serde_json::to_string(&envelope) {
                Ok(message) => message,
                Err(e) => {
                    error!(error = %e, "Failed to encode relay envelope");
                    return;
                }
            };
            let mut conn = self.publisher.clone();
            tokio::spawn(async move {
                let result = redis::cmd("PUBLISH")
                    .arg(RELAY_CHANNEL)
                    .arg(message)
                    .query_async::<i64>(&mut conn)
                    .await;
                if let Err(e) = result {
                    warn!(session_id = %session_id, error = %e, "Redis PUBLISH failed");
                }
            });
        }

        /// Delivers frames published by other processes until `token` fires.
        pub fn spawn_subscriber(
            self: &Arc<Self>,
            broadcaster: Broadcaster,
            token: CancellationToken,
        ) {
            let bridge = Arc::clone(self);
            tokio::spawn(async move {
                let mut pubsub = match bridge.client.get_async_pubsub().await {
                    Ok(pubsub) => pubsub,
                    Err(e) => {
                        error!(error = %e, "Redis subscriber connection failed");
                        return;
                    }
                };
                if let Err(e) = pubsub.subscribe(RELAY_CHANNEL).await {
                    error!(error = %e, "Redis SUBSCRIBE failed");
                    return;
                }
                let mut stream = pubsub.on_message();
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        next = stream.next() => {
                            let Some(msg) = next else { break };
                            let Ok(payload) = msg.get_payload::<String>() else {
                                continue;
                            };
                            bridge.relay_in(&broadcaster, &payload);
                        }
                    }
                }
                info!("Redis relay subscriber stopped");
            });
        }

        fn relay_in(&self, broadcaster: &Broadcaster, payload: &str) {
            match serde_json::from_str::<RelayEnvelope>(payload) {
                Ok(envelope) if envelope.origin == self.node_id => {}
                Ok(envelope) => {
                    let delivered = broadcaster.deliver_local(
                        envelope.session_id,
                        envelope.audience,
                        Frame::from(envelope.payload),
                    );
                    debug!(session_id = %envelope.session_id, delivered, "Relayed frame");
                }
                Err(e) => warn!(error = %e, "Dropping malformed relay envelope"),
            }
        }
    }
}

#[cfg(not(feature = "redis-pubsub"))]
pub mod implementation {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use storyhub_core::error::AppError;
    use storyhub_core::result::AppResult;
    use storyhub_core::types::id::SessionId;

    use crate::channel::broadcast::{Audience, Broadcaster};
    use crate::connection::Frame;

    /// Stub Redis pub/sub bridge when redis feature is disabled.
    #[derive(Debug, Clone)]
    pub struct RedisPubSubBridge;

    impl RedisPubSubBridge {
        /// Always fails: the relay needs the `redis-pubsub` feature.
        pub async fn connect(_url: &str) -> AppResult<Self> {
            Err(AppError::configuration(
                "Redis relay requested but the redis-pubsub feature is disabled",
            ))
        }

        pub fn publish(&self, _session_id: SessionId, _audience: Audience, _frame: Frame) {}

        pub fn spawn_subscriber(
            self: &Arc<Self>,
            _broadcaster: Broadcaster,
            _token: CancellationToken,
        ) {
        }
    }
}

pub use implementation::RedisPubSubBridge;

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_core::types::id::{ConnectionId, UserId};

    #[test]
    fn test_envelope_carries_sender_connection() {
        let conn = ConnectionId::new();
        let envelope = RelayEnvelope {
            origin: Uuid::new_v4(),
            session_id: SessionId::new(),
            audience: Audience::Others(conn),
            payload: r#"{"type":"draw"}"#.into(),
        };
        let text = serde_json::to_string(&envelope).expect("encode");
        let back: RelayEnvelope = serde_json::from_str(&text).expect("decode");
        assert_eq!(back.audience, Audience::Others(conn));
    }

    #[test]
    fn test_envelope_round_trips_audience() {
        let user = UserId::new();
        let envelope = RelayEnvelope {
            origin: Uuid::new_v4(),
            session_id: SessionId::new(),
            audience: Audience::Except(user),
            payload: r#"{"type":"clear"}"#.into(),
        };
        let text = serde_json::to_string(&envelope).expect("encode");
        let back: RelayEnvelope = serde_json::from_str(&text).expect("decode");
        assert_eq!(back.audience, Audience::Except(user));
        assert_eq!(back.payload, envelope.payload);
    }
}
