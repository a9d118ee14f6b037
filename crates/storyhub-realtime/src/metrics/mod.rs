//! Realtime engine metrics.

pub mod connections;
pub mod messages;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total frames queued to clients
    pub messages_sent: AtomicU64,
    /// Total frames received from clients
    pub messages_received: AtomicU64,
    /// Frames answered with a private error
    pub messages_rejected: AtomicU64,
    /// Total connections admitted
    pub connections_total: AtomicU64,
    /// Connections currently admitted
    pub connections_active: AtomicU64,
    /// Handshakes refused with a close code
    pub connections_refused: AtomicU64,
    /// Peers disconnected because their queue overflowed
    pub peers_dropped: AtomicU64,
    /// Sessions finalized into stories
    pub stories_finalized: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_refused: self.connections_refused.load(Ordering::Relaxed),
            peers_dropped: self.peers_dropped.load(Ordering::Relaxed),
            stories_finalized: self.stories_finalized.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_rejected: u64,
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_refused: u64,
    pub peers_dropped: u64,
    pub stories_finalized: u64,
}
